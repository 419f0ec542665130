//! Heuristic classifier for messages that need live web facts.
//!
//! Each category is an independent regex over the lowercased message. A
//! message needs search when any category matches. The rule set is plain data
//! so it can be loaded from configuration and enumerated by tests.

use regex::Regex;
use serde::{Deserialize, Serialize};
use trinho_core::ConfigError;
use trinho_core::util::normalize;

/// One named trigger rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerCategory {
    pub name: String,
    pub pattern: String,
}

impl TriggerCategory {
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_categories")]
    pub categories: Vec<TriggerCategory>,
}

const fn default_enabled() -> bool {
    true
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            categories: default_categories(),
        }
    }
}

/// Default categories for Vietnamese and English, in evaluation order.
#[must_use]
pub fn default_categories() -> Vec<TriggerCategory> {
    vec![
        TriggerCategory::new(
            "temporal_recency",
            r"(?i)(hôm nay|hiện nay|hiện tại|bây giờ|lúc này|năm nay|tuần này|tháng này|mới nhất|gần đây|\btoday\b|\bcurrent(ly)?\b|\blatest\b|\bright now\b|\bthis (week|month|year)\b)",
        ),
        TriggerCategory::new(
            "statistics",
            r"(?i)(bao nhiêu|dân số|thống kê|tỷ lệ|tỉ lệ|số liệu|số lượng|\bhow (many|much)\b|\bpopulation\b|\bstatistics?\b)",
        ),
        TriggerCategory::new(
            "recent_events",
            r"(?i)(vừa xảy ra|vừa diễn ra|mới đây|hôm qua|tuần trước|tháng trước|sự kiện|\byesterday\b|\blast (week|month)\b|\bjust happened\b|\brecent(ly)?\b)",
        ),
        TriggerCategory::new(
            "pricing",
            r"(?i)(giá (vàng|xăng|dầu|điện|nhà|đất|cả|bán|mua|bao nhiêu)|bao nhiêu tiền|tỷ giá|tỉ giá|chứng khoán|cổ phiếu|lãi suất|\bbitcoin\b|\busd\b|\bprices?\b|\bexchange rate\b|\bstocks?\b)",
        ),
        TriggerCategory::new(
            "news",
            r"(?i)(tin tức|thời sự|bản tin|tin mới|\bnews\b|\bheadlines?\b)",
        ),
        TriggerCategory::new(
            "geography_admin",
            r"(?i)(sáp nhập|tỉnh thành|đơn vị hành chính|địa giới|thủ đô|\bcapital of\b|\bprovinces?\b|\bmerged?\b)",
        ),
        TriggerCategory::new(
            "living_person",
            r"(?i)(còn sống|qua đời|đang làm gì|tổng thống|thủ tướng|chủ tịch|\bceo\b|\bstill alive\b|\bpassed away\b|\bpresident\b|\bprime minister\b)",
        ),
        TriggerCategory::new(
            "new_release",
            r"(?i)(phiên bản mới|ra mắt|tính năng mới|bản cập nhật|\bnew version\b|\breleased?\b|\blaunch(ed)?\b|\bnew features?\b)",
        ),
    ]
}

/// Compiled trigger rules.
#[derive(Debug)]
pub struct SearchTrigger {
    rules: Vec<(String, Regex)>,
    enabled: bool,
}

impl SearchTrigger {
    /// Compile a rule set. Any invalid pattern fails construction.
    pub fn new(config: &TriggerConfig) -> Result<Self, ConfigError> {
        let rules = config
            .categories
            .iter()
            .map(|c| {
                Regex::new(&c.pattern)
                    .map(|re| (c.name.clone(), re))
                    .map_err(|e| ConfigError::InvalidPattern {
                        name: c.name.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules,
            enabled: config.enabled,
        })
    }

    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(&TriggerConfig::default())
    }

    /// Name of the first category that matches, if any.
    #[must_use]
    pub fn matched_category(&self, text: &str) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        let lower = normalize(text);
        self.rules
            .iter()
            .find(|(_, re)| re.is_match(&lower))
            .map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn needs_search(&self, text: &str) -> bool {
        self.matched_category(text).is_some()
    }

    /// Names of every category that matches.
    #[must_use]
    pub fn matching_categories(&self, text: &str) -> Vec<&str> {
        if !self.enabled {
            return Vec::new();
        }
        let lower = normalize(text);
        self.rules
            .iter()
            .filter(|(_, re)| re.is_match(&lower))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    #[must_use]
    pub fn category_names(&self) -> Vec<&str> {
        self.rules.iter().map(|(name, _)| name.as_str()).collect()
    }
}
