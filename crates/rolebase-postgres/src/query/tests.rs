//! Tests for query builder module.

use super::*;
use crate::{RolebaseError, SqlValue};

fn roles() -> QueryBuilder {
    QueryBuilder::new("user", "roles").unwrap()
}

#[test]
fn test_simple_select() {
    let query = roles().build_select();
    assert_eq!(query.sql(), "SELECT * FROM \"user\".\"roles\"");
    assert!(query.params().is_none());
}

#[test]
fn test_select_with_columns() {
    let query = roles().select(&["id", "name"]).unwrap().build_select();
    assert_eq!(query.sql(), "SELECT id, name FROM \"user\".\"roles\"");
}

#[test]
fn test_select_with_where_skips_null() {
    let query = roles()
        .where_clause(
            FieldMap::new()
                .with("name", "admin")
                .with("is_active", None::<bool>),
        )
        .unwrap()
        .build_select();
    assert_eq!(query.sql(), "SELECT * FROM \"user\".\"roles\" WHERE name = $1");
    assert_eq!(
        query.params(),
        Some(&[SqlValue::String("admin".to_string())][..])
    );
}

#[test]
fn test_select_where_all_null_has_no_params() {
    let query = roles()
        .where_clause(FieldMap::new().with("name", None::<String>))
        .unwrap()
        .build_select();
    assert_eq!(query.sql(), "SELECT * FROM \"user\".\"roles\"");
    assert!(query.params().is_none());
}

#[test]
fn test_select_with_multiple_where() {
    let query = QueryBuilder::new("user", "employees")
        .unwrap()
        .where_clause(FieldMap::new().with("role_id", 2).with("is_active", true))
        .unwrap()
        .build_select();
    assert_eq!(
        query.sql(),
        "SELECT * FROM \"user\".\"employees\" WHERE role_id = $1 AND is_active = $2"
    );
    assert_eq!(
        query.params(),
        Some(&[SqlValue::Int(2), SqlValue::Bool(true)][..])
    );
}

#[test]
fn test_where_like_wraps_value() {
    let query = QueryBuilder::new("user", "employees")
        .unwrap()
        .where_clause(FieldMap::new().with("is_active", true))
        .unwrap()
        .where_like(FieldMap::new().with("first_name", "an_a"))
        .unwrap()
        .build_select();
    assert_eq!(
        query.sql(),
        "SELECT * FROM \"user\".\"employees\" WHERE is_active = $1 AND first_name ILIKE $2"
    );
    assert_eq!(
        query.params().unwrap()[1],
        SqlValue::String("%an\\_a%".to_string())
    );
}

#[test]
fn test_where_like_rejects_non_text() {
    let err = roles()
        .where_like(FieldMap::new().with("id", 1))
        .unwrap_err();
    assert!(matches!(err, RolebaseError::Query(_)));
}

#[test]
fn test_select_with_order_by_and_limit() {
    let query = roles()
        .order_by("name", OrderDirection::Desc)
        .unwrap()
        .limit(10, 20)
        .build_select();
    assert_eq!(
        query.sql(),
        "SELECT * FROM \"user\".\"roles\" ORDER BY name DESC LIMIT 10 OFFSET 20"
    );
    assert!(query.params().is_none());
}

#[test]
fn test_order_by_default_is_ascending() {
    let query = roles()
        .order_by("name", OrderDirection::default())
        .unwrap()
        .build_select();
    assert!(query.sql().ends_with("ORDER BY name ASC"));
}

#[test]
fn test_order_direction_from_str() {
    assert_eq!("desc".parse::<OrderDirection>().unwrap(), OrderDirection::Desc);
    assert_eq!("ASC".parse::<OrderDirection>().unwrap(), OrderDirection::Asc);
    assert!("sideways".parse::<OrderDirection>().is_err());
}

#[test]
fn test_insert_skips_falsy_values() {
    let query = roles()
        .insert(
            FieldMap::new()
                .with("name", "editor")
                .with("description", None::<String>)
                .with("is_active", true),
        )
        .unwrap()
        .build_insert(None)
        .unwrap();
    assert_eq!(
        query.sql(),
        "INSERT INTO \"user\".\"roles\" (name, is_active) VALUES ($1, $2)"
    );
    assert_eq!(query.param_count(), 2);
}

#[test]
fn test_insert_drops_false_but_insert_non_null_keeps_it() {
    let data = FieldMap::new().with("name", "viewer").with("is_active", false);

    let falsy = roles().insert(data.clone()).unwrap().build_insert(None).unwrap();
    assert_eq!(falsy.sql(), "INSERT INTO \"user\".\"roles\" (name) VALUES ($1)");

    let kept = roles()
        .insert_non_null(data)
        .unwrap()
        .build_insert(None)
        .unwrap();
    assert_eq!(
        kept.sql(),
        "INSERT INTO \"user\".\"roles\" (name, is_active) VALUES ($1, $2)"
    );
    assert_eq!(kept.params().unwrap()[1], SqlValue::Bool(false));
}

#[test]
fn test_insert_with_returning() {
    let query = roles()
        .insert(FieldMap::new().with("name", "auditor"))
        .unwrap()
        .build_insert(Some(&["id", "name"]))
        .unwrap();
    assert_eq!(
        query.sql(),
        "INSERT INTO \"user\".\"roles\" (name) VALUES ($1) RETURNING id, name"
    );
}

#[test]
fn test_insert_without_columns_fails() {
    let err = roles()
        .insert(FieldMap::new().with("description", ""))
        .unwrap()
        .build_insert(None)
        .unwrap_err();
    assert_eq!(
        err,
        RolebaseError::Query("INSERT requires at least one column".to_string())
    );
}

#[test]
fn test_update_numbers_set_before_where() {
    let query = roles()
        .where_clause(FieldMap::new().with("id", 3))
        .unwrap()
        .set(
            FieldMap::new()
                .with("description", "Read only")
                .with("name", None::<String>)
                .with("is_active", false),
        )
        .unwrap()
        .build_update(Some(&["*"]))
        .unwrap();
    assert_eq!(
        query.sql(),
        "UPDATE \"user\".\"roles\" SET description = $1, is_active = $2 WHERE id = $3 RETURNING *"
    );
    assert_eq!(
        query.params(),
        Some(
            &[
                SqlValue::String("Read only".to_string()),
                SqlValue::Bool(false),
                SqlValue::Int(3)
            ][..]
        )
    );
}

#[test]
fn test_update_without_set_fails() {
    let err = roles()
        .set(FieldMap::new().with("name", None::<String>))
        .unwrap()
        .build_update(None)
        .unwrap_err();
    assert_eq!(
        err,
        RolebaseError::Query("UPDATE requires at least one field in SET clause".to_string())
    );
}

#[test]
fn test_placeholders_match_params() {
    let query = QueryBuilder::new("user", "employees")
        .unwrap()
        .set(FieldMap::new().with("phone", "555").with("address", "Main St"))
        .unwrap()
        .where_clause(FieldMap::new().with("id", 7).with("role_id", None::<i32>))
        .unwrap()
        .build_update(None)
        .unwrap();
    assert_eq!(query.placeholder_count(), query.param_count());
    assert_eq!(query.param_count(), 3);
}

#[test]
fn test_invalid_identifiers_rejected() {
    assert!(QueryBuilder::new("user", "roles; DROP TABLE roles").is_err());
    assert!(QueryBuilder::new("pg_catalog", "pg_class").is_err());
    assert!(roles().select(&["name--"]).is_err());
    assert!(roles()
        .where_clause(FieldMap::new().with("1=1 OR name", "x"))
        .is_err());
    assert!(roles().order_by("name DESC", OrderDirection::Asc).is_err());
    assert!(roles()
        .insert(FieldMap::new().with("name", "x"))
        .unwrap()
        .build_insert(Some(&["id; --"]))
        .is_err());
}

#[test]
fn test_values_never_reach_sql_text() {
    let query = roles()
        .where_clause(FieldMap::new().with("name", "'; DROP TABLE roles; --"))
        .unwrap()
        .build_select();
    assert!(!query.sql().contains("DROP"));
}

#[test]
fn test_field_map_from_iter_preserves_order() {
    let map: FieldMap = vec![("b", 1), ("a", 2)].into_iter().collect();
    let fields: Vec<&str> = map.iter().map(|(f, _)| f).collect();
    assert_eq!(fields, vec!["b", "a"]);
}

#[test]
fn test_duplicate_fields_rejected() {
    let dup = || FieldMap::new().with("name", "a").with("name", "b");

    assert!(matches!(roles().where_clause(dup()), Err(RolebaseError::Query(_))));
    assert!(matches!(roles().where_like(dup()), Err(RolebaseError::Query(_))));
    assert!(matches!(roles().insert(dup()), Err(RolebaseError::Query(_))));
    assert!(matches!(roles().set(dup()), Err(RolebaseError::Query(_))));

    // A null entry still claims its name.
    let with_null = FieldMap::new().with("description", None::<String>).with("description", "x");
    assert!(roles().set(with_null).is_err());
}

#[test]
fn test_duplicate_columns_rejected_across_calls() {
    let insert = roles()
        .insert(FieldMap::new().with("name", "a"))
        .unwrap()
        .insert(FieldMap::new().with("name", "b"));
    assert!(insert.is_err());

    let update = roles()
        .set(FieldMap::new().with("is_active", false))
        .unwrap()
        .set(FieldMap::new().with("is_active", true));
    assert!(update.is_err());
}

#[test]
fn test_where_may_repeat_field_across_calls() {
    let query = roles()
        .where_clause(FieldMap::new().with("name", "a"))
        .unwrap()
        .where_clause(FieldMap::new().with("name", "b"))
        .unwrap()
        .build_select();
    assert_eq!(
        query.sql(),
        "SELECT * FROM \"user\".\"roles\" WHERE name = $1 AND name = $2"
    );
}
