//! Stage model for user-interactive authentication.
//!
//! A homeserver answers an unfinished registration request with a set of
//! alternative flows, each an ordered list of stage identifiers. This module
//! turns that answer into a [`FlowResult`]: the distinct stages still
//! missing and the ones already completed, each tagged with whether it is
//! mandatory.

use serde_json::{Map, Value};

use crate::client::UiaResponse;

/// Stage type identifiers defined by the Matrix specification.
pub mod stage_type {
    /// Password login.
    pub const PASSWORD: &str = "m.login.password";
    /// Google reCAPTCHA challenge.
    pub const RECAPTCHA: &str = "m.login.recaptcha";
    /// Email ownership verification.
    pub const EMAIL_IDENTITY: &str = "m.login.email.identity";
    /// Phone number ownership verification.
    pub const MSISDN: &str = "m.login.msisdn";
    /// No-op stage used to terminate a flow.
    pub const DUMMY: &str = "m.login.dummy";
    /// Terms of service acceptance.
    pub const TERMS: &str = "m.login.terms";
    /// Single sign-on.
    pub const SSO: &str = "m.login.sso";
    /// Token login.
    pub const TOKEN: &str = "m.login.token";
}

/// Policy documents attached to a terms stage, keyed by policy name.
pub type TermPolicies = Map<String, Value>;

/// One stage of a user-interactive authentication flow.
///
/// A stage is mandatory when it appears in every alternative flow the
/// homeserver offered; a non-mandatory stage belongs to at least one flow
/// the client could avoid by completing another.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// `m.login.recaptcha`, with the site public key to render the widget.
    ReCaptcha {
        /// Whether every offered flow requires this stage.
        mandatory: bool,
        /// reCAPTCHA site key, empty when the homeserver omitted it.
        public_key: String,
    },

    /// `m.login.email.identity`.
    Email {
        /// Whether every offered flow requires this stage.
        mandatory: bool,
    },

    /// `m.login.msisdn`.
    Msisdn {
        /// Whether every offered flow requires this stage.
        mandatory: bool,
    },

    /// `m.login.dummy`. Can be mandatory when a flow has no other stage;
    /// the account then cannot be created with only a username and a
    /// password, the dummy stage has to be submitted too.
    Dummy {
        /// Whether every offered flow requires this stage.
        mandatory: bool,
    },

    /// `m.login.terms`, with the policies to present to the user.
    Terms {
        /// Whether every offered flow requires this stage.
        mandatory: bool,
        /// Policy documents keyed by policy name.
        policies: TermPolicies,
    },

    /// A stage type unknown to this client, kept with its raw identifier
    /// and parameters so callers can route it to a fallback.
    Other {
        /// Whether every offered flow requires this stage.
        mandatory: bool,
        /// The raw stage type identifier.
        kind: String,
        /// The raw stage parameters.
        params: Map<String, Value>,
    },
}

impl Stage {
    /// Build a stage from its identifier and the per-stage parameters of
    /// the authentication session.
    fn from_parts(kind: &str, mandatory: bool, params: Option<&Value>) -> Stage {
        match kind {
            stage_type::RECAPTCHA => {
                let public_key = params
                    .and_then(|value| value.get("public_key"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Stage::ReCaptcha {
                    mandatory,
                    public_key,
                }
            }
            stage_type::EMAIL_IDENTITY => Stage::Email { mandatory },
            stage_type::MSISDN => Stage::Msisdn { mandatory },
            stage_type::DUMMY => Stage::Dummy { mandatory },
            stage_type::TERMS => {
                let policies = params
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                Stage::Terms {
                    mandatory,
                    policies,
                }
            }
            other => {
                let params = params
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                Stage::Other {
                    mandatory,
                    kind: other.to_string(),
                    params,
                }
            }
        }
    }

    /// The stage type identifier.
    pub fn kind(&self) -> &str {
        match self {
            Stage::ReCaptcha { .. } => stage_type::RECAPTCHA,
            Stage::Email { .. } => stage_type::EMAIL_IDENTITY,
            Stage::Msisdn { .. } => stage_type::MSISDN,
            Stage::Dummy { .. } => stage_type::DUMMY,
            Stage::Terms { .. } => stage_type::TERMS,
            Stage::Other { kind, .. } => kind,
        }
    }

    /// Whether every offered flow requires this stage.
    pub fn is_mandatory(&self) -> bool {
        match self {
            Stage::ReCaptcha { mandatory, .. }
            | Stage::Email { mandatory }
            | Stage::Msisdn { mandatory }
            | Stage::Dummy { mandatory }
            | Stage::Terms { mandatory, .. }
            | Stage::Other { mandatory, .. } => *mandatory,
        }
    }
}

/// The stages of an authentication session, split by completion.
///
/// `missing_stages` and `completed_stages` together cover every distinct
/// stage identifier across the offered flows, with no overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowResult {
    /// Stages the homeserver still expects.
    pub missing_stages: Vec<Stage>,
    /// Stages already satisfied within this session.
    pub completed_stages: Vec<Stage>,
}

impl FlowResult {
    /// Compute the flow result from an authentication session response.
    ///
    /// Stage identifiers are collected across all flows in first-seen
    /// order, deduplicated, classified as mandatory when every flow lists
    /// them, and partitioned by the server's completed set.
    pub fn from_uia_response(response: &UiaResponse) -> FlowResult {
        let mut seen: Vec<&str> = Vec::new();
        for flow in &response.flows {
            for stage in &flow.stages {
                if !seen.contains(&stage.as_str()) {
                    seen.push(stage);
                }
            }
        }

        let mut missing_stages = Vec::new();
        let mut completed_stages = Vec::new();

        for kind in seen {
            let mandatory = response
                .flows
                .iter()
                .all(|flow| flow.stages.iter().any(|stage| stage == kind));
            let stage = Stage::from_parts(kind, mandatory, response.params.get(kind));

            if response.completed.iter().any(|completed| completed == kind) {
                completed_stages.push(stage);
            } else {
                missing_stages.push(stage);
            }
        }

        FlowResult {
            missing_stages,
            completed_stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::UiaFlow;

    fn uia_response(flows: Vec<Vec<&str>>, completed: Vec<&str>) -> UiaResponse {
        UiaResponse {
            session: "sess".to_string(),
            flows: flows
                .into_iter()
                .map(|stages| UiaFlow {
                    stages: stages.into_iter().map(str::to_string).collect(),
                })
                .collect(),
            completed: completed.into_iter().map(str::to_string).collect(),
            params: Map::new(),
            errcode: None,
            error: None,
        }
    }

    #[test]
    fn test_stage_is_mandatory_iff_present_in_every_flow() {
        let response = uia_response(
            vec![
                vec!["m.login.recaptcha", "m.login.terms", "m.login.email.identity"],
                vec!["m.login.recaptcha", "m.login.terms", "m.login.msisdn"],
            ],
            vec![],
        );

        let result = FlowResult::from_uia_response(&response);

        for stage in &result.missing_stages {
            let in_every_flow = response
                .flows
                .iter()
                .all(|flow| flow.stages.iter().any(|kind| kind == stage.kind()));
            assert_eq!(stage.is_mandatory(), in_every_flow, "{}", stage.kind());
        }
    }

    #[test]
    fn test_alternative_flows_mark_shared_stage_mandatory() {
        // "password+email" OR "password+recaptcha": only the shared stage
        // is mandatory.
        let response = uia_response(
            vec![
                vec!["m.login.password", "m.login.email.identity"],
                vec!["m.login.password", "m.login.recaptcha"],
            ],
            vec![],
        );

        let result = FlowResult::from_uia_response(&response);

        let password = result
            .missing_stages
            .iter()
            .find(|stage| stage.kind() == "m.login.password")
            .unwrap();
        let email = result
            .missing_stages
            .iter()
            .find(|stage| stage.kind() == "m.login.email.identity")
            .unwrap();
        let recaptcha = result
            .missing_stages
            .iter()
            .find(|stage| stage.kind() == "m.login.recaptcha")
            .unwrap();

        assert!(password.is_mandatory());
        assert!(!email.is_mandatory());
        assert!(!recaptcha.is_mandatory());
    }

    #[test]
    fn test_missing_and_completed_partition_all_stages() {
        let response = uia_response(
            vec![
                vec!["m.login.recaptcha", "m.login.terms"],
                vec!["m.login.recaptcha", "m.login.dummy"],
            ],
            vec!["m.login.recaptcha"],
        );

        let result = FlowResult::from_uia_response(&response);

        let mut all_kinds: Vec<&str> = result
            .missing_stages
            .iter()
            .chain(&result.completed_stages)
            .map(Stage::kind)
            .collect();
        all_kinds.sort_unstable();

        assert_eq!(
            all_kinds,
            vec!["m.login.dummy", "m.login.recaptcha", "m.login.terms"]
        );
        assert_eq!(result.completed_stages.len(), 1);
        assert_eq!(result.completed_stages[0].kind(), "m.login.recaptcha");
        // No stage appears on both sides.
        for completed in &result.completed_stages {
            assert!(
                !result
                    .missing_stages
                    .iter()
                    .any(|missing| missing.kind() == completed.kind())
            );
        }
    }

    #[test]
    fn test_recaptcha_stage_carries_public_key() {
        let mut response = uia_response(vec![vec!["m.login.recaptcha"]], vec![]);
        response.params.insert(
            "m.login.recaptcha".to_string(),
            serde_json::json!({"public_key": "6LcgI54UAAAAABGdGmru"}),
        );

        let result = FlowResult::from_uia_response(&response);

        assert_eq!(
            result.missing_stages[0],
            Stage::ReCaptcha {
                mandatory: true,
                public_key: "6LcgI54UAAAAABGdGmru".to_string(),
            }
        );
    }

    #[test]
    fn test_terms_stage_carries_policies() {
        let mut response = uia_response(vec![vec!["m.login.terms"]], vec![]);
        response.params.insert(
            "m.login.terms".to_string(),
            serde_json::json!({
                "policies": {
                    "privacy_policy": {
                        "version": "1.0",
                        "en": {"name": "Privacy Policy", "url": "https://example.org/privacy"}
                    }
                }
            }),
        );

        let result = FlowResult::from_uia_response(&response);

        match &result.missing_stages[0] {
            Stage::Terms {
                mandatory,
                policies,
            } => {
                assert!(*mandatory);
                assert!(policies.contains_key("policies"));
            }
            other => panic!("expected terms stage, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_stage_becomes_other() {
        let mut response = uia_response(vec![vec!["org.example.custom"]], vec![]);
        response.params.insert(
            "org.example.custom".to_string(),
            serde_json::json!({"hint": "anything"}),
        );

        let result = FlowResult::from_uia_response(&response);

        match &result.missing_stages[0] {
            Stage::Other {
                mandatory,
                kind,
                params,
            } => {
                assert!(*mandatory);
                assert_eq!(kind, "org.example.custom");
                assert_eq!(params.get("hint").and_then(Value::as_str), Some("anything"));
            }
            other => panic!("expected other stage, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_stage_across_flows_is_reported_once() {
        let response = uia_response(
            vec![
                vec!["m.login.dummy"],
                vec!["m.login.dummy", "m.login.terms"],
            ],
            vec![],
        );

        let result = FlowResult::from_uia_response(&response);

        let dummy_count = result
            .missing_stages
            .iter()
            .filter(|stage| stage.kind() == "m.login.dummy")
            .count();
        assert_eq!(dummy_count, 1);
        assert_eq!(result.missing_stages.len(), 2);
    }
}
