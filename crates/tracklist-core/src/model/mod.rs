pub mod change;
pub mod entities;
pub mod entity_type;
pub mod list;
pub mod metadata;
pub mod snapshot;

pub use change::{Change, ChangeType};
pub use entities::{GithubRepository, ObsidianPlugin, ObsidianTheme, PluginStats};
pub use entity_type::{EntityType, SourceType};
pub use list::{
    archived_full_name, CanonicalEntity, List, ListItem, ListItemUpdate, NewListItem,
};
pub use metadata::{
    ArchivedMetadata, GithubRepositoryMetadata, ListItemMetadata, ObsidianPluginMetadata,
    ObsidianThemeMetadata, RepositoryStats,
};
pub use snapshot::Snapshot;
