#![forbid(unsafe_code)]

//! Page description: which elements to bind and what the lists contain.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ConfigError;
use crate::mirror::MirrorConfig;

/// Number of items rendered into each list on the default page.
pub const DEFAULT_ITEM_COUNT: u32 = 1000;

/// Element ids and list contents for a two-list page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Scrollable region observed as the primary list.
    pub primary_id: String,
    /// Scrollable region observed as the secondary list.
    pub secondary_id: String,
    /// Container receiving the primary list's items.
    pub primary_items_id: String,
    /// Container receiving the secondary list's items.
    pub secondary_items_id: String,
    /// Items rendered into each container.
    pub item_count: u32,
    pub mirror: MirrorConfig,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            primary_id: "main-list".to_string(),
            secondary_id: "side-list".to_string(),
            primary_items_id: "main-list-items".to_string(),
            secondary_items_id: "side-list-items".to_string(),
            item_count: DEFAULT_ITEM_COUNT,
            mirror: MirrorConfig::default(),
        }
    }
}

impl PageConfig {
    /// Parse a JSON page description. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_item_count(mut self, count: u32) -> Self {
        self.item_count = count;
        self
    }

    #[must_use]
    pub fn with_mirror(mut self, mirror: MirrorConfig) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ids = [
            ("primary_id", &self.primary_id),
            ("secondary_id", &self.secondary_id),
            ("primary_items_id", &self.primary_items_id),
            ("secondary_items_id", &self.secondary_items_id),
        ];
        if let Some((field, _)) = ids.into_iter().find(|(_, id)| id.trim().is_empty()) {
            return Err(ConfigError::EmptyElementId(field));
        }
        if self.item_count == 0 {
            return Err(ConfigError::ZeroItemCount);
        }
        self.mirror.validate()
    }
}

/// Finds page elements by id.
///
/// The web frontend implements this over `document.getElementById`.
pub trait ElementLookup {
    type Element;

    fn element_by_id(&self, id: &str) -> Option<Self::Element>;
}

/// Elements a page binds to once both scroll regions are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageElements<E> {
    pub primary: E,
    pub secondary: E,
    /// Item containers `(primary, secondary)`. Lists are populated only when
    /// both exist.
    pub containers: Option<(E, E)>,
}

impl PageConfig {
    /// Look up the page's elements.
    ///
    /// Returns `None` when either scroll region is missing: nothing is
    /// populated and no mirror is installed.
    pub fn resolve<L: ElementLookup + ?Sized>(
        &self,
        lookup: &L,
    ) -> Option<PageElements<L::Element>> {
        let (Some(primary), Some(secondary)) = (
            lookup.element_by_id(&self.primary_id),
            lookup.element_by_id(&self.secondary_id),
        ) else {
            debug!(
                primary = %self.primary_id,
                secondary = %self.secondary_id,
                "scroll regions missing"
            );
            return None;
        };

        let containers = match (
            lookup.element_by_id(&self.primary_items_id),
            lookup.element_by_id(&self.secondary_items_id),
        ) {
            (Some(primary), Some(secondary)) => Some((primary, secondary)),
            _ => {
                debug!("list containers missing; lists stay empty");
                None
            }
        };

        Some(PageElements {
            primary,
            secondary,
            containers,
        })
    }
}

/// One row of a mirrored list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    /// 1-based position in the list.
    pub index: u32,
    pub label: String,
}

impl ListItem {
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self {
            index,
            label: format!("Item {index}"),
        }
    }

    /// Value of the item's `data-index` attribute.
    #[must_use]
    pub fn index_attr(&self) -> String {
        self.index.to_string()
    }
}

/// Items `1..=count`, labelled `Item {i}`.
pub fn list_items(count: u32) -> impl Iterator<Item = ListItem> {
    (1..=count).map(ListItem::new)
}
