//! ID type wrappers for type safety.

mod id_macro;

use serde::{Deserialize, Serialize};

use id_macro::impl_id;

/// Identity of a user-facing item on the shelf.
/// 架子上一个条目的标识。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(String);

/// Identity of one component (one classified representation) of an item.
/// 条目中一个组件（一种表示形式）的标识。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentId(String);

impl_id!(ItemId, ComponentId);
