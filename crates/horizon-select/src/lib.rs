//! State and selection engine for searchable dropdown controls.
//!
//! Horizon Select keeps everything a select control needs behind a single
//! [`SelectStore`]:
//!
//! - **Option sources**: static list options, element options and a paged
//!   dynamic source, merged according to an [`OptionBehavior`]
//! - **Display list**: wildcard search, group headers and lazy pagination
//!   of the dynamic source
//! - **Selection**: single or multiple, exclusive items, group and
//!   select-all operations, inverted ("excluded") selections
//! - **Policies**: strict values, auto-select, auto-disable and the
//!   one-open-at-a-time registry
//!
//! Rendering is left to the host; it reads the store and listens to
//! [`SelectStore::changed`].
//!
//! # Example
//!
//! ```no_run
//! use horizon_select::{FetchResponse, Item, SelectStore, StoreError};
//!
//! # async fn demo() {
//! let store = SelectStore::builder()
//!     .multiple(true)
//!     .fetch(|search: String, offset, limit| async move {
//!         let items = (offset..offset + limit)
//!             .map(|i| Item::new(i as i64, format!("{search}{i}")))
//!             .collect();
//!         Ok::<_, StoreError>(FetchResponse::new(1000, items))
//!     })
//!     .build();
//!
//! store.commit(horizon_select::Commit::IsOpen(true));
//! store.settled().await;
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod fetch;
pub mod item;
pub mod params;
pub mod registry;
pub mod search;
pub mod store;
pub mod value;

pub use catalog::{
    IconFamily, Icons, PartialIcons, PartialTexts, Texts, change_icons, change_texts,
};
pub use error::{Result, StoreError};
pub use fetch::{FetchCallback, FetchResponse, GetItemsCallback, fetch_callback, get_items_callback};
pub use item::{Group, GroupEntry, Item, ItemId, OptionEntry};
pub use params::{
    HideFilter, ListPosition, OptionBehavior, OptionOperation, SelectionOverflow, SourceKind,
    StoreParams,
};
pub use registry::{OpenRegistry, StoreId};
pub use search::SearchPattern;
pub use store::{Commit, SelectStore, SelectStoreBuilder, Status, StoreEvent};
pub use value::{SelectedOptions, SelectionValue};
