use crate::domain::action::{ActionRequest, ApprovalPolicy};

/// Where the engine reads policies from. Lookup failures are reported, not raised.
pub trait PolicySource {
    fn active_policies(&self) -> Result<Vec<ApprovalPolicy>, String>;
}

impl PolicySource for Vec<ApprovalPolicy> {
    fn active_policies(&self) -> Result<Vec<ApprovalPolicy>, String> {
        Ok(self.iter().filter(|policy| policy.active).cloned().collect())
    }
}

/// A policy list fetched ahead of time, or the error the fetch produced.
#[derive(Clone, Debug)]
pub struct LoadedPolicies(pub Result<Vec<ApprovalPolicy>, String>);

impl PolicySource for LoadedPolicies {
    fn active_policies(&self) -> Result<Vec<ApprovalPolicy>, String> {
        match &self.0 {
            Ok(policies) => policies.active_policies(),
            Err(error) => Err(error.clone()),
        }
    }
}

impl ApprovalPolicy {
    pub fn matches(&self, request: &ActionRequest) -> bool {
        if !self.active {
            return false;
        }

        let action_type = normalize_key(&request.action_type);
        if !self.action_types.iter().any(|candidate| normalize_key(candidate) == action_type) {
            return false;
        }

        if !self.urgency_levels.is_empty() && !self.urgency_levels.contains(&request.urgency) {
            return false;
        }

        if let (Some(limit), Some(cost)) = (self.max_estimated_cost, request.estimated_cost) {
            if cost > limit {
                return false;
            }
        }

        if !self.applies_to_all_properties {
            let Some(property_id) = request.property_id.as_deref() else {
                return false;
            };
            let property_key = normalize_key(property_id);
            if !self.property_ids.iter().any(|candidate| normalize_key(candidate) == property_key)
            {
                return false;
            }
        }

        true
    }
}

/// First fit in ascending priority; ties keep source order.
pub fn select_policy<'a>(
    policies: &'a [ApprovalPolicy],
    request: &ActionRequest,
) -> Option<&'a ApprovalPolicy> {
    let mut ordered: Vec<&ApprovalPolicy> = policies.iter().collect();
    ordered.sort_by_key(|policy| policy.priority);
    ordered.into_iter().find(|policy| policy.matches(request))
}

pub(crate) fn normalize_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{select_policy, LoadedPolicies, PolicySource};
    use crate::domain::action::{ActionRequest, ActionUrgency, ApprovalPolicy};

    fn policy(id: &str, priority: i32) -> ApprovalPolicy {
        ApprovalPolicy {
            id: id.to_string(),
            name: id.to_string(),
            action_types: vec!["create_work_order".to_string()],
            urgency_levels: Vec::new(),
            max_estimated_cost: None,
            applies_to_all_properties: true,
            property_ids: Vec::new(),
            auto_approve: false,
            require_explicit_approval: true,
            required_approvals: 1,
            priority,
            active: true,
            expires_after_hours: None,
        }
    }

    fn request() -> ActionRequest {
        ActionRequest {
            action_type: "Create_Work_Order".to_string(),
            title: "Replace hallway light".to_string(),
            description: String::new(),
            requested_by: "staff-1".to_string(),
            property_id: Some("prop-9".to_string()),
            urgency: ActionUrgency::Normal,
            estimated_cost: Some(Decimal::new(250, 0)),
            payload: serde_json::Value::Null,
        }
    }

    #[test]
    fn lowest_priority_number_wins_even_if_less_specific() {
        let specific = ApprovalPolicy {
            urgency_levels: vec![ActionUrgency::Normal],
            max_estimated_cost: Some(Decimal::new(500, 0)),
            ..policy("specific", 20)
        };
        let broad = policy("broad", 10);
        let policies = vec![specific, broad];

        let selected = select_policy(&policies, &request()).expect("a policy matches");
        assert_eq!(selected.id, "broad");
    }

    #[test]
    fn cost_urgency_and_property_constraints_filter() {
        let cheap_only =
            ApprovalPolicy { max_estimated_cost: Some(Decimal::new(100, 0)), ..policy("cheap", 1) };
        let emergencies =
            ApprovalPolicy { urgency_levels: vec![ActionUrgency::Emergency], ..policy("urgent", 2) };
        let other_property = ApprovalPolicy {
            applies_to_all_properties: false,
            property_ids: vec!["prop-1".to_string()],
            ..policy("other-property", 3)
        };
        let this_property = ApprovalPolicy {
            applies_to_all_properties: false,
            property_ids: vec!["PROP-9".to_string()],
            ..policy("this-property", 4)
        };
        let policies = vec![cheap_only, emergencies, other_property, this_property];

        let selected = select_policy(&policies, &request()).expect("a policy matches");
        assert_eq!(selected.id, "this-property");
    }

    #[test]
    fn unknown_cost_passes_cost_ceiling() {
        let capped =
            ApprovalPolicy { max_estimated_cost: Some(Decimal::new(100, 0)), ..policy("capped", 1) };
        let mut request = request();
        request.estimated_cost = None;

        assert!(capped.matches(&request));
    }

    #[test]
    fn inactive_policies_never_match() {
        let inactive = ApprovalPolicy { active: false, ..policy("inactive", 1) };
        assert!(select_policy(&[inactive.clone()], &request()).is_none());
        assert!(vec![inactive].active_policies().expect("in-memory source").is_empty());
    }

    #[test]
    fn failed_lookup_surfaces_as_error() {
        let loaded = LoadedPolicies(Err("database locked".to_string()));
        assert_eq!(loaded.active_policies(), Err("database locked".to_string()));
    }
}
