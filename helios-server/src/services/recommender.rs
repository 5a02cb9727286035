//! Scaling recommendations with a process-wide per-workload cooldown.
//!
//! Ported from `original_source/ml/inference/recommender.py::RecommenderService.recommend`:
//! utilization is the peak of the supplied forecast, horizontal scale
//! decisions come from comparing it to the configured thresholds, and a
//! vertical right-size suggestion rides alongside when the workload's CPU
//! limit dwarfs its request.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use helios_core::{resource, wire::{RecommendAction, RecommendMetadata, RecommendRequest, RecommendResponse}};

use crate::config::RecommendationConfig;

pub struct RecommenderService {
    config: RecommendationConfig,
    cooldowns: DashMap<String, DateTime<Utc>>,
}

impl RecommenderService {
    #[must_use]
    pub fn new(config: RecommendationConfig) -> Self {
        Self { config, cooldowns: DashMap::new() }
    }

    fn workload_key(namespace: &str, workload: &str) -> String {
        format!("{namespace}/{workload}")
    }

    #[must_use]
    pub fn recommend(&self, req: &RecommendRequest) -> RecommendResponse {
        let key = Self::workload_key(&req.namespace, &req.workload);
        let cooldown = chrono::Duration::minutes(self.config.cooldown_minutes);

        if let Some(last) = self.cooldowns.get(&key) {
            if Utc::now() - *last < cooldown {
                return RecommendResponse {
                    action: RecommendAction::NoAction,
                    target_replicas: Some(req.current_state.replicas),
                    confidence: 1.0,
                    estimated_savings_percent: None,
                    reason: "cooldown active, skipping re-evaluation".to_owned(),
                    metadata: RecommendMetadata { cooldown_active: true },
                    secondary_action: None,
                };
            }
        }

        let utilization = req
            .predictions
            .as_ref()
            .map(|values| values.iter().copied().fold(0.0, f64::max))
            .unwrap_or(0.0);
        let replicas = f64::from(req.current_state.replicas.max(1));

        let mut response = if utilization > self.config.scale_up_threshold {
            let target = (replicas * utilization / req.target_utilization)
                .ceil()
                .min(f64::from(self.config.max_replicas)) as u32;
            RecommendResponse {
                action: RecommendAction::ScaleOut,
                target_replicas: Some(target.max(self.config.min_replicas)),
                confidence: (0.5 + (utilization - self.config.scale_up_threshold) * 2.0).min(0.95),
                estimated_savings_percent: None,
                reason: format!("projected utilization {utilization:.2} exceeds scale-up threshold {:.2}", self.config.scale_up_threshold),
                metadata: RecommendMetadata { cooldown_active: false },
                secondary_action: None,
            }
        } else if utilization < self.config.scale_down_threshold {
            let target = ((replicas * utilization / req.target_utilization).ceil() as u32).max(self.config.min_replicas);
            let savings = (replicas - f64::from(target)) / replicas * 100.0;
            RecommendResponse {
                action: RecommendAction::ScaleIn,
                target_replicas: Some(target),
                confidence: (0.4 + (self.config.scale_down_threshold - utilization)).min(0.85),
                estimated_savings_percent: Some(savings.max(0.0)),
                reason: format!("projected utilization {utilization:.2} is below scale-down threshold {:.2}", self.config.scale_down_threshold),
                metadata: RecommendMetadata { cooldown_active: false },
                secondary_action: None,
            }
        } else {
            RecommendResponse {
                action: RecommendAction::NoAction,
                target_replicas: Some(req.current_state.replicas),
                confidence: 0.9,
                estimated_savings_percent: None,
                reason: format!("projected utilization {utilization:.2} is within target band"),
                metadata: RecommendMetadata { cooldown_active: false },
                secondary_action: None,
            }
        };

        response.secondary_action = self.right_size_action(req).map(Box::new);

        if !matches!(response.action, RecommendAction::NoAction) {
            self.cooldowns.insert(key, Utc::now());
        }

        response
    }

    fn right_size_action(&self, req: &RecommendRequest) -> Option<RecommendResponse> {
        let request = resource::parse_cpu_millicores(req.current_state.cpu_request.as_deref()?);
        let limit = resource::parse_cpu_millicores(req.current_state.cpu_limit.as_deref()?);
        if request <= 0.0 || limit <= request * 3.0 {
            return None;
        }
        Some(RecommendResponse {
            action: RecommendAction::RightSize,
            target_replicas: None,
            confidence: 0.6,
            estimated_savings_percent: None,
            reason: format!("CPU limit ({limit:.0}m) is more than 3x the request ({request:.0}m); consider tightening it"),
            metadata: RecommendMetadata { cooldown_active: false },
            secondary_action: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use helios_core::wire::WorkloadState;

    use super::*;

    fn request(replicas: u32, predictions: Vec<f64>) -> RecommendRequest {
        RecommendRequest {
            workload: "api".to_owned(),
            namespace: "prod".to_owned(),
            current_state: WorkloadState { replicas, ..Default::default() },
            predictions: Some(predictions),
            target_utilization: 0.70,
        }
    }

    #[test]
    fn scale_out_then_cooldown_blocks_the_immediate_retry() {
        let service = RecommenderService::new(RecommendationConfig::default());
        let req = request(2, vec![0.20, 0.40, 0.90]);

        let first = service.recommend(&req);
        assert_eq!(first.action, RecommendAction::ScaleOut);
        assert_eq!(first.target_replicas, Some(3));
        assert!((first.confidence - 0.60).abs() < 1e-9);
        assert!(!first.metadata.cooldown_active);

        let second = service.recommend(&req);
        assert_eq!(second.action, RecommendAction::NoAction);
        assert!(second.metadata.cooldown_active);
    }

    #[test]
    fn low_utilization_recommends_scale_in_with_savings() {
        let service = RecommenderService::new(RecommendationConfig::default());
        let req = request(10, vec![0.10]);
        let response = service.recommend(&req);
        assert_eq!(response.action, RecommendAction::ScaleIn);
        assert!(response.estimated_savings_percent.unwrap() > 0.0);
    }

    #[test]
    fn oversized_cpu_limit_adds_a_secondary_right_size_action() {
        let service = RecommenderService::new(RecommendationConfig::default());
        let mut req = request(2, vec![0.50]);
        req.current_state.cpu_request = Some("100m".to_owned());
        req.current_state.cpu_limit = Some("1000m".to_owned());
        let response = service.recommend(&req);
        assert_eq!(response.action, RecommendAction::NoAction);
        let secondary = response.secondary_action.expect("oversized limit should add a secondary action");
        assert_eq!(secondary.action, RecommendAction::RightSize);
    }
}
