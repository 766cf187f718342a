//! Static entity schemas
//!
//! Every table the service exposes is described by an [`EntitySchema`]. The
//! schema is the single allow-list for identifiers that reach SQL: column
//! names, filterable fields, searchable fields, sort columns and relation
//! keys all come from `'static` schema data, never from request input.
//!
//! # Example
//!
//! ```rust
//! use crud_service::schema::{Column, EntitySchema};
//!
//! static TAGS: EntitySchema = EntitySchema {
//!     name: "Tag",
//!     table: "tags",
//!     columns: &[Column::text("label"), Column::integer("weight")],
//!     filterable: &["weight"],
//!     searchable: &["label"],
//!     relations: &[],
//! };
//!
//! assert!(TAGS.is_filterable("weight"));
//! assert!(TAGS.is_sortable("created_at"));
//! assert!(!TAGS.is_sortable("unknown"));
//! ```

use std::fmt;

/// Primary key column present on every table
pub const ID_COLUMN: &str = "id";

/// Creation timestamp column present on every table
pub const CREATED_AT: &str = "created_at";

/// Modification timestamp column present on every table
pub const UPDATED_AT: &str = "updated_at";

/// Storage type of a column, used to bind and decode values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// 64-bit signed integer
    Integer,
    /// UTF-8 text
    Text,
}

/// A writable column of an entity table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: &'static str,
    /// Storage type
    pub kind: ColumnKind,
    /// Never selected, so never returned to callers
    pub hidden: bool,
    /// Hashed with Argon2id before it is written
    pub hashed: bool,
}

impl Column {
    /// Text column
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Text,
            hidden: false,
            hashed: false,
        }
    }

    /// Integer column
    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Integer,
            hidden: false,
            hashed: false,
        }
    }

    /// Mark the column as a secret: hashed on write, hidden on read
    pub const fn secret(self) -> Self {
        Self {
            hidden: true,
            hashed: true,
            ..self
        }
    }
}

/// Cardinality of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The owning record holds the foreign key (`posts.user_id -> users.id`)
    BelongsTo,
    /// The related records hold the foreign key (`users.id <- posts.user_id`)
    HasMany,
}

/// A named relation eager-loaded alongside records
pub struct Relation {
    /// Key under which the related data appears in the record
    pub name: &'static str,
    /// Cardinality
    pub kind: RelationKind,
    /// Schema of the related table
    pub related: &'static EntitySchema,
    /// Foreign key column (on the owner for `BelongsTo`, on the related table for `HasMany`)
    pub foreign_key: &'static str,
}

impl Relation {
    /// `BelongsTo` relation through `foreign_key` on the owning table
    pub const fn belongs_to(
        name: &'static str,
        related: &'static EntitySchema,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::BelongsTo,
            related,
            foreign_key,
        }
    }

    /// `HasMany` relation through `foreign_key` on the related table
    pub const fn has_many(
        name: &'static str,
        related: &'static EntitySchema,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::HasMany,
            related,
            foreign_key,
        }
    }
}

impl fmt::Debug for Relation {
    // Schemas reference each other, so only the related table name is printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("related", &self.related.table)
            .field("foreign_key", &self.foreign_key)
            .finish()
    }
}

/// Description of one entity table
#[derive(Debug)]
pub struct EntitySchema {
    /// Entity name used in logs and events (e.g. "User")
    pub name: &'static str,
    /// Table name
    pub table: &'static str,
    /// Writable columns, excluding `id` and the timestamps
    pub columns: &'static [Column],
    /// Fields accepted as equality filters
    pub filterable: &'static [&'static str],
    /// Fields matched by the free-text search
    pub searchable: &'static [&'static str],
    /// Relations loaded with every returned record
    pub relations: &'static [Relation],
}

impl EntitySchema {
    /// Look up a writable column by name
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Columns returned to callers
    pub fn visible_columns(&self) -> impl Iterator<Item = &'static Column> {
        self.columns.iter().filter(|column| !column.hidden)
    }

    /// Resolve a filter key to its static name if the entity allows filtering on it
    pub fn filterable_field(&self, name: &str) -> Option<&'static str> {
        self.filterable.iter().copied().find(|field| *field == name)
    }

    /// Whether `name` is a declared filterable field
    pub fn is_filterable(&self, name: &str) -> bool {
        self.filterable_field(name).is_some()
    }

    /// Resolve a sort column to its static name
    ///
    /// `id`, the timestamps and every visible column are sortable.
    pub fn sortable_column(&self, name: &str) -> Option<&'static str> {
        match name {
            ID_COLUMN => Some(ID_COLUMN),
            CREATED_AT => Some(CREATED_AT),
            UPDATED_AT => Some(UPDATED_AT),
            _ => self.visible_columns().map(|c| c.name).find(|c| *c == name),
        }
    }

    /// Whether `name` may be used as a sort column
    pub fn is_sortable(&self, name: &str) -> bool {
        self.sortable_column(name).is_some()
    }

    /// Look up a relation by name
    pub fn relation(&self, name: &str) -> Option<&'static Relation> {
        self.relations.iter().find(|relation| relation.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static AUTHORS: EntitySchema = EntitySchema {
        name: "Author",
        table: "authors",
        columns: &[
            Column::text("name"),
            Column::text("secret").secret(),
            Column::text("status"),
        ],
        filterable: &["status"],
        searchable: &["name"],
        relations: &[Relation::has_many("books", &BOOKS, "author_id")],
    };

    static BOOKS: EntitySchema = EntitySchema {
        name: "Book",
        table: "books",
        columns: &[Column::integer("author_id"), Column::text("title")],
        filterable: &["author_id"],
        searchable: &["title"],
        relations: &[Relation::belongs_to("author", &AUTHORS, "author_id")],
    };

    #[test]
    fn test_secret_columns_are_hidden_and_hashed() {
        let secret = AUTHORS.column("secret").unwrap();
        assert!(secret.hidden);
        assert!(secret.hashed);
        assert_eq!(secret.kind, ColumnKind::Text);

        let visible: Vec<_> = AUTHORS.visible_columns().map(|c| c.name).collect();
        assert_eq!(visible, vec!["name", "status"]);
    }

    #[test]
    fn test_sortable_columns() {
        assert_eq!(AUTHORS.sortable_column("id"), Some("id"));
        assert_eq!(AUTHORS.sortable_column("updated_at"), Some("updated_at"));
        assert_eq!(AUTHORS.sortable_column("name"), Some("name"));
        assert!(!AUTHORS.is_sortable("secret"));
        assert!(!AUTHORS.is_sortable("name; DROP TABLE authors"));
    }

    #[test]
    fn test_filterable_fields() {
        assert!(BOOKS.is_filterable("author_id"));
        assert!(!BOOKS.is_filterable("title"));
    }

    #[test]
    fn test_relations_reference_each_other() {
        let books = AUTHORS.relation("books").unwrap();
        assert_eq!(books.kind, RelationKind::HasMany);
        assert_eq!(books.related.table, "books");

        let author = books.related.relation("author").unwrap();
        assert_eq!(author.kind, RelationKind::BelongsTo);
        assert_eq!(author.related.table, "authors");
    }
}
