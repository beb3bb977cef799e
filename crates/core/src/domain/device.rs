use serde::{Deserialize, Serialize};

/// One client pick from the device catalog. Transient input to estimation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSelection {
    pub category: String,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity_type: Option<String>,
}

impl DeviceSelection {
    pub fn new(category: impl Into<String>, quantity: i64) -> Self {
        Self { category: category.into(), quantity, vendor: None, model: None, complexity_type: None }
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_complexity(mut self, complexity_type: impl Into<String>) -> Self {
        self.complexity_type = Some(complexity_type.into());
        self
    }
}

/// Lowercased, trimmed category key with spaces and dashes folded to `_`.
pub fn normalize_category(category: &str) -> String {
    category.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

/// `garage_door` -> `Garage Door`.
pub fn display_name(category: &str) -> String {
    normalize_category(category)
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::{display_name, normalize_category};

    #[test]
    fn category_keys_are_normalized() {
        assert_eq!(normalize_category(" Smart-Lock "), "smart_lock");
        assert_eq!(normalize_category("leak detector"), "leak_detector");
    }

    #[test]
    fn display_names_are_title_cased() {
        assert_eq!(display_name("garage_door"), "Garage Door");
        assert_eq!(display_name("hub"), "Hub");
    }
}
