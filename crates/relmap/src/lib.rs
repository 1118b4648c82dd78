//! # relmap
//!
//! Driver-agnostic object/relational mapping: a parameterized SQL expression
//! algebra, a declarative property/column mapping model, and a statement
//! generator that turns a mapping plus input data into SQL.
//!
//! ## Features
//!
//! - **Composable SQL**: `sql!` templates nest with correct parameter order and
//!   never need renumbering; identifiers and raw text are explicit markers
//! - **Flexible mapping**: auto-named, explicit, multi-column and computed
//!   (SQL-side transformed) properties, plus read-only properties
//! - **Deterministic output**: columns follow mapping declaration order
//! - **Bring your own engine**: implement [`Driver`] (a `query` and an
//!   `execute`) to get the generic [`Dao`]; `?` placeholders are rendered
//!   per engine at the adapter boundary
//! - **PostgreSQL adapter**: `relmap::pg` behind the `postgres` feature
//!
//! ## Example
//!
//! ```ignore
//! use relmap::{Mapping, Naming, SqlGenerator, Value};
//! use std::sync::Arc;
//!
//! let mapping = Mapping::<Value>::builder("users")
//!     .naming(Naming::SnakeCase)
//!     .auto("userId")
//!     .auto("userName")
//!     .property("isAdmin", "is_admin")
//!     .read_only(["userId"])
//!     .build()?;
//!
//! let generator = SqlGenerator::new(Arc::new(mapping));
//! let stmt = generator.update_statement(
//!     &serde_json::json!({ "userName": "alice" }),
//!     generator.where_equal_clause(&serde_json::json!({ "userId": 7 }))?,
//! )?;
//! assert_eq!(stmt.text(), "UPDATE users SET user_name=? WHERE user_id=?");
//! ```

pub mod config;
pub mod dao;
pub mod driver;
pub mod error;
pub mod expr;
pub mod generator;
mod ident;
pub mod mapping;
pub mod placeholder;
pub mod row;
pub mod value;

#[cfg(feature = "postgres")]
pub mod pg;

#[cfg(test)]
mod testing;

pub use config::{CodecRegistry, MappingFile};
pub use dao::{Dao, Page, PageRequest};
pub use driver::Driver;
pub use error::{OrmError, OrmResult};
pub use expr::{Fragment, IntoFragment, SqlExpr, SqlIdent, SqlUnsafe, bind, ident, unsafe_sql};
pub use generator::{SortOrder, SqlGenerator};
pub use ident::validate_identifier;
pub use mapping::{
    AutoConfig, Column, ColumnDef, Mapping, MappingBuilder, MultiColumnDef, Naming,
    PropertyDef, PropertyMapping, SingleColumnDef, ToDb,
};
pub use placeholder::PlaceholderStyle;
pub use row::{Record, Row, RowExt, WriteRow, set_column};
pub use value::{DbValue, Value};
