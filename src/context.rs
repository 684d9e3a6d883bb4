//! Execution contexts.
//!
//! An [`ExecutionContext`] bundles everything needed to run one
//! entity-driven operation for one batch shape: the statement text, a
//! [`Binder`] that writes one or many entities into a parameter set, and an
//! optional [`KeySetter`] that copies generated keys back onto entities.
//!
//! Contexts are compiled by [`create`] and cached in a [`ContextCache`]
//! keyed by connection target, builder, kind, table, entity type tag and
//! field list, requested columns, qualifiers, hints and batch size. A batch
//! whose final chunk is smaller than the others therefore gets its own
//! context.

mod binder;
mod cache;
mod provider;

pub use binder::{Binder, KeySetter};
pub use cache::ContextCache;
pub use provider::{ContextError, ContextRequest, compile, create};

use std::sync::Arc;

use crate::statement::OperationKind;

/// Compiled statement text plus binding functions for one batch shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Operation kind.
    pub kind: OperationKind,
    /// Target table.
    pub table: String,
    /// Statement text rendered for `batch_size` rows.
    pub command_text: Arc<str>,
    /// Rows bound per command.
    pub batch_size: usize,
    /// Parameter binder.
    pub binder: Binder,
    /// Generated-key writer, when the statement returns keys the entity can
    /// hold.
    pub key_setter: Option<KeySetter>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caches::Caches;
    use crate::config::DbSetting;
    use crate::datum::Type;
    use crate::driver::{MemoryConnection, Parameters};
    use crate::schema::SchemaField;
    use crate::statement::{AnsiStatementBuilder, StatementError};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Person {
        id: i64,
        name: String,
        nickname: Option<String>,
    }

    crate::impl_entity!(Person { id, name, nickname });

    fn people() -> Vec<SchemaField> {
        vec![
            SchemaField::new("Id", 0, Type::Int8).primary().identity(),
            SchemaField::new("Name", 1, Type::Text),
        ]
    }

    fn request(kind: OperationKind, batch_size: usize) -> ContextRequest<'static> {
        ContextRequest {
            kind,
            table: "people",
            batch_size,
            fields: None,
            qualifiers: &[],
            hints: None,
        }
    }

    #[tokio::test]
    async fn test_contexts_are_cached_per_batch_size() {
        let caches = Caches::new();
        let builder = AnsiStatementBuilder::new(&DbSetting::default());
        let mut conn = MemoryConnection::new("memory://ctx").with_table("people", people());
        let log = conn.log();
        let person = Person::default();

        let three = create(&mut conn, &caches, &builder, &person, &request(OperationKind::InsertAll, 3))
            .await
            .unwrap();
        let again = create(&mut conn, &caches, &builder, &person, &request(OperationKind::InsertAll, 3))
            .await
            .unwrap();
        let one = create(&mut conn, &caches, &builder, &person, &request(OperationKind::InsertAll, 1))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&three, &again));
        assert!(!Arc::ptr_eq(&three, &one));
        assert_eq!(three.batch_size, 3);
        assert_eq!(one.batch_size, 1);
        assert_eq!(caches.contexts().len(), 2);
        assert_eq!(log.describe_calls(), 1);

        // Identity is excluded from the insert; the entity-only nickname is ignored.
        assert_eq!(three.binder.columns().collect::<Vec<_>>(), vec!["Name"]);
        assert_eq!(three.key_setter.as_ref().map(|k| k.field()), Some("Id"));
        assert!(three.command_text.contains("@Name_2"));
        assert!(!one.command_text.contains("@Name_0"));
    }

    #[tokio::test]
    async fn test_update_binds_qualifiers() {
        let caches = Caches::new();
        let builder = AnsiStatementBuilder::new(&DbSetting::default());
        let mut conn = MemoryConnection::new("memory://ctx").with_table("people", people());

        let context = create(
            &mut conn,
            &caches,
            &builder,
            &Person::default(),
            &request(OperationKind::Update, 1),
        )
        .await
        .unwrap();
        assert_eq!(context.binder.columns().collect::<Vec<_>>(), vec!["Name", "Id"]);
        assert!(context.key_setter.is_none());
        assert_eq!(
            &*context.command_text,
            r#"UPDATE "people" SET "Name" = @Name WHERE "Id" = @Id;"#
        );
    }

    #[test]
    fn test_every_bound_parameter_appears_in_text() {
        let caches = Caches::new();
        let builder = AnsiStatementBuilder::new(&DbSetting::default());
        let mut fields = people();
        fields.push(SchemaField::new("Nickname", 2, Type::Text).nullable());
        let qualifiers = vec!["Name".to_string()];
        let items = vec![Person::default(), Person::default()];

        for kind in [
            OperationKind::UpdateAll,
            OperationKind::MergeAll,
            OperationKind::InsertAll,
        ] {
            let context = compile(
                &caches,
                &builder,
                "t",
                &items[0],
                &ContextRequest {
                    qualifiers: &qualifiers,
                    ..request(kind, 2)
                },
                &fields,
            )
            .unwrap();
            let mut params = Parameters::new();
            context.binder.bind_many(&mut params, &items);

            assert_eq!(context.binder.params_per_row(), 2, "{kind}");
            assert_eq!(params.len(), 4, "{kind}");
            for param in &params {
                let placeholder = format!("@{}", param.name);
                assert!(
                    context.command_text.contains(&placeholder),
                    "{kind}: {placeholder} missing from {}",
                    context.command_text
                );
            }
            assert!(params.get("Id_0").is_none(), "{kind}");
        }
    }

    #[test]
    fn test_shape_errors() {
        let caches = Caches::new();
        let builder = AnsiStatementBuilder::new(&DbSetting::default());
        let fields = people();

        let explicit = vec!["Salary".to_string()];
        let err = compile(
            &caches,
            &builder,
            "t",
            &Person::default(),
            &ContextRequest {
                fields: Some(&explicit),
                ..request(OperationKind::Insert, 1)
            },
            &fields,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ContextError::Statement(StatementError::UnqualifiedField {
                field: "Salary".to_string()
            })
        );

        let unrelated = vec![SchemaField::new("Sku", 0, Type::Text).primary()];
        let err = compile(
            &caches,
            &builder,
            "t",
            &Person::default(),
            &request(OperationKind::Insert, 1),
            &unrelated,
        )
        .unwrap_err();
        assert!(matches!(err, ContextError::UnresolvedEntityShape { .. }));

        let keyless = vec![SchemaField::new("Name", 0, Type::Text)];
        let err = compile(
            &caches,
            &builder,
            "t",
            &Person::default(),
            &request(OperationKind::Merge, 1),
            &keyless,
        )
        .unwrap_err();
        assert_eq!(err, ContextError::Statement(StatementError::PrimaryKeyRequired));
    }
}
