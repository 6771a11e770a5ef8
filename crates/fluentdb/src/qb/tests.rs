//! Integration tests for the qb module.

use std::collections::BTreeMap;

use crate::error::OrmError;
use crate::qb::{
    AggregateFn, Builder, Glue, Grammar, JoinKind, Predicate, PredicateKind, Statement, raw, table,
};
use crate::value::Value;

fn prefixed(name: &str) -> Builder {
    Builder::with_grammar(Grammar::with_prefix("t_")).table(name)
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|&v| Value::Int(v)).collect()
}

fn assert_balanced(stmt: &Statement) {
    assert_eq!(
        stmt.placeholder_count(),
        stmt.bindings.len(),
        "placeholders and bindings differ for `{}`",
        stmt.sql
    );
}

#[test]
fn test_select_basic() {
    assert_eq!(table("users").to_sql(), "select * from users");
}

#[test]
fn test_select_columns_and_distinct() {
    let sql = table("users").select(["id", "users.name"]).distinct().to_sql();
    assert_eq!(sql, "select distinct `id`, users.`name` from users");
}

#[test]
fn test_empty_select_list_means_star() {
    let sql = table("users").select(Vec::<&str>::new()).to_sql();
    assert_eq!(sql, "select * from users");
}

#[test]
fn test_where_limit_example() {
    let stmt = table("user").where_op("name", "=", "nopsky").limit(10).to_select();
    assert_eq!(stmt.sql, "select * from user where `name` = ? limit 10");
    assert_eq!(stmt.bindings, vec![Value::from("nopsky")]);
}

#[test]
fn test_where_in_delete_example() {
    let stmt = table("user").where_in("id", [1, 2, 3]).to_delete();
    assert_eq!(stmt.sql, "delete from user where `id` in (?,?,?)");
    assert_eq!(stmt.bindings, ints(&[1, 2, 3]));
}

#[test]
fn test_prefix_applies_to_tables() {
    let stmt = prefixed("user").where_eq("name", "nopsky").limit(10).to_select();
    assert_eq!(stmt.sql, "select * from t_user where `name` = ? limit 10");
}

#[test]
fn test_leading_predicate_has_no_glue() {
    let cases = [
        table("u").or_where_eq("a", 1),
        table("u").or_where_null("a"),
        table("u").or_where_in("a", [1, 2]),
        table("u").where_pred(Predicate::new("a", ">", 1).glue(Glue::Or)),
    ];
    for b in cases {
        let sql = b.to_sql();
        assert!(sql.starts_with("select * from u where `a`"), "{sql}");
        assert!(!sql.contains("where or"), "{sql}");
        assert!(!sql.contains("where and"), "{sql}");
    }

    let having = table("u")
        .group_by(["a"])
        .or_having_op(raw("count(*)"), ">", 1)
        .to_sql();
    assert_eq!(having, "select * from u group by `a` having count(*) > ?");
}

#[test]
fn test_glue_between_predicates() {
    let sql = table("u")
        .where_eq("a", 1)
        .or_where_eq("b", 2)
        .where_not_null("c")
        .to_sql();
    assert_eq!(sql, "select * from u where `a` = ? or `b` = ? and `c` is not null");
}

#[test]
fn test_null_predicates_bind_nothing() {
    let stmt = table("u").where_null("deleted_at").where_eq("a", 1).to_select();
    assert_eq!(stmt.sql, "select * from u where `deleted_at` is null and `a` = ?");
    assert_eq!(stmt.bindings, ints(&[1]));
}

#[test]
fn test_where_in_sizes() {
    for n in [0usize, 1, 5] {
        let values: Vec<i64> = (1..=n as i64).collect();
        let stmt = table("u").where_in("id", values.clone()).to_select();
        assert_eq!(stmt.bindings, ints(&values));
        assert_eq!(stmt.placeholder_count(), n);
        if n == 0 {
            assert_eq!(stmt.sql, "select * from u where 1=0");
        } else {
            let expected = format!("select * from u where `id` in ({})", vec!["?"; n].join(","));
            assert_eq!(stmt.sql, expected);
        }
    }
}

#[test]
fn test_empty_not_in_matches_everything() {
    let stmt = table("u").where_not_in("id", Vec::<i64>::new()).to_select();
    assert_eq!(stmt.sql, "select * from u where 1=1");
    assert!(stmt.bindings.is_empty());
}

#[test]
fn test_kind_override() {
    let stmt = table("u")
        .where_pred(Predicate::new("a", "in", 7).kind(PredicateKind::In))
        .where_pred(Predicate::new("b", "is not", 0).kind(PredicateKind::Null))
        .to_select();
    assert_eq!(stmt.sql, "select * from u where `a` in (?) and `b` is not null");
    assert_eq!(stmt.bindings, ints(&[7]));
}

#[test]
fn test_limit_ignores_non_positive() {
    assert_eq!(table("u").limit(0).to_sql(), "select * from u");
    assert_eq!(table("u").limit(-1).to_sql(), "select * from u");
    let sql = table("u").limit(10).to_sql();
    assert_eq!(sql.matches("limit").count(), 1);
    assert!(sql.ends_with("limit 10"));
}

#[test]
fn test_offset_before_limit() {
    assert_eq!(
        table("u").limit(5).offset(20).to_sql(),
        "select * from u offset 20 limit 5"
    );
}

#[test]
fn test_multiple_order_terms() {
    let sql = table("u").order_by("a").order_by_desc("b").to_sql();
    assert_eq!(sql, "select * from u order by `a` asc, `b` desc");
}

#[test]
fn test_full_clause_order() {
    let sql = prefixed("user")
        .select(["user.id"])
        .left_join("orders", "user.id", "=", "orders.user_id")
        .where_op("orders.total", ">", 100)
        .group_by(["user.id"])
        .having_op(raw("count(*)"), ">", 2)
        .order_by("user.id")
        .offset(0)
        .limit(3)
        .to_sql();
    assert_eq!(
        sql,
        "select t_user.`id` from t_user left join t_orders on t_user.`id` = t_orders.`user_id` \
         where t_orders.`total` > ? group by t_user.`id` having count(*) > ? \
         order by t_user.`id` asc offset 0 limit 3"
    );
}

#[test]
fn test_join_variants() {
    let sql = table("a")
        .inner_join("b", "a.id", "=", "b.a_id")
        .right_join("c", "a.id", "=", "c.a_id")
        .to_sql();
    assert_eq!(
        sql,
        "select * from a inner join b on a.`id` = b.`a_id` right join c on a.`id` = c.`a_id`"
    );
}

#[test]
fn test_join_with_multiple_conditions() {
    let stmt = table("a")
        .join_with(JoinKind::Left, "b", |j| {
            j.on("a.id", "=", "b.a_id")
                .or_on("a.alt", "=", "b.alt")
                .on_value("b.state", "=", 1)
        })
        .to_select();
    assert_eq!(
        stmt.sql,
        "select * from a left join b on a.`id` = b.`a_id` or a.`alt` = b.`alt` and b.`state` = ?"
    );
    assert_eq!(stmt.bindings, ints(&[1]));
}

#[test]
fn test_bindings_flatten_join_before_where() {
    // where added before the join, still flattens after it
    let stmt = table("a")
        .where_eq("x", 2)
        .having_eq("h", 3)
        .join_with(JoinKind::Inner, "b", |j| j.on_value("b.k", "=", 1))
        .to_select();
    assert_eq!(stmt.bindings, ints(&[1, 2, 3]));
    assert_balanced(&stmt);
}

#[test]
fn test_union_bindings_captured_at_attach() {
    let other = table("archive").where_eq("year", 2019);
    let stmt = table("current")
        .union_all(other)
        .where_eq("year", 2020)
        .to_select();
    assert_eq!(
        stmt.sql,
        "select * from current where `year` = ? union all select * from archive where `year` = ?"
    );
    assert_eq!(stmt.bindings, ints(&[2020, 2019]));
}

#[test]
fn test_union_keyword() {
    let sql = table("a").union(table("b")).to_sql();
    assert_eq!(sql, "select * from a union select * from b");
}

#[test]
fn test_aggregate_clears_columns_and_orders() {
    let b = table("u")
        .select(["id", "name"])
        .order_by("id")
        .aggregate(AggregateFn::Count, "*");
    assert!(b.columns.is_empty());
    assert!(b.orders.is_empty());
    assert_eq!(b.to_sql(), "select count(*) as aggregate from u");
}

#[test]
fn test_aggregate_keeps_orders_with_group_by() {
    let sql = table("u")
        .group_by(["dept"])
        .order_by("dept")
        .aggregate(AggregateFn::Max, "salary")
        .to_sql();
    assert_eq!(
        sql,
        "select max(`salary`) as aggregate from u group by `dept` order by `dept` asc"
    );
}

#[test]
fn test_aggregate_distinct() {
    let sql = table("u").distinct().aggregate(AggregateFn::Count, "email").to_sql();
    assert_eq!(sql, "select count(distinct `email`) as aggregate from u");
}

#[test]
fn test_update_sql() {
    let stmt = table("user")
        .where_eq("id", 9)
        .to_update([("name", Value::from("ann")), ("age", Value::from(30))])
        .unwrap();
    assert_eq!(stmt.sql, "update user set `name` = ?, `age` = ? where `id` = ?");
    assert_eq!(
        stmt.bindings,
        vec![Value::from("ann"), Value::from(30), Value::from(9)]
    );
}

#[test]
fn test_update_without_where() {
    let stmt = prefixed("user").to_update([("a", 1)]).unwrap();
    assert_eq!(stmt.sql, "update t_user set `a` = ?");
}

#[test]
fn test_update_empty_fails() {
    let err = table("user")
        .to_update(Vec::<(String, Value)>::new())
        .unwrap_err();
    assert!(matches!(err, OrmError::EmptyUpdate));
}

#[test]
fn test_delete_without_where() {
    assert_eq!(prefixed("user").to_delete().sql, "delete from t_user");
}

#[test]
fn test_insert_sql() {
    let mut row = BTreeMap::new();
    row.insert("name", Value::from("ann"));
    row.insert("age", Value::from(30));
    let stmt = prefixed("user").to_insert(&row).unwrap();
    assert_eq!(stmt.sql, "insert into t_user (`age`, `name`) values (?,?)");
    assert_eq!(stmt.bindings, vec![Value::from(30), Value::from("ann")]);
}

#[test]
fn test_insert_ignores_where_bindings() {
    let mut row = BTreeMap::new();
    row.insert("a", 1);
    let stmt = table("t").where_eq("x", 5).to_insert(&row).unwrap();
    assert_balanced(&stmt);
}

#[test]
fn test_multi_insert_sql_is_row_count_independent() {
    let rows: Vec<BTreeMap<&str, i64>> = (0..4)
        .map(|i| BTreeMap::from([("a", i), ("b", i * 10)]))
        .collect();
    let batch = table("t").to_multi_insert(&rows).unwrap();
    assert_eq!(batch.sql, "insert into t (`a`, `b`) values (?,?)");
    assert_eq!(batch.rows.len(), 4);
    for row in &batch.rows {
        assert_eq!(row.len(), batch.placeholder_count());
    }
}

#[test]
fn test_multi_insert_needs_sequence() {
    let row = BTreeMap::from([("a", 1)]);
    assert!(matches!(
        table("t").to_multi_insert(&row),
        Err(OrmError::NotASequence)
    ));
}

#[test]
fn test_json_path_column() {
    let sql = table("u").where_eq("meta->'$.age'", 3).to_sql();
    assert_eq!(sql, "select * from u where meta->'$.age' = ?");
}

#[test]
fn test_placeholders_match_bindings() {
    let select = table("a")
        .join_with(JoinKind::Left, "b", |j| j.on("a.id", "=", "b.id").on_value("b.x", "<", 4))
        .where_in("c", [1, 2, 3])
        .or_where_null("d")
        .where_not_in("e", Vec::<i64>::new())
        .group_by(["f"])
        .having_in("g", [5, 6])
        .union(table("z").where_eq("q", 1).where_in("r", [1, 2]))
        .to_select();
    assert_balanced(&select);

    let update = table("a")
        .where_in("id", [1, 2])
        .having_eq("ignored", 1)
        .to_update([("x", 1), ("y", 2)])
        .unwrap();
    assert_balanced(&update);

    let delete = table("a")
        .join_with(JoinKind::Inner, "b", |j| j.on_value("b.k", "=", 1))
        .where_op("n", "<>", 0)
        .where_null("m")
        .to_delete();
    assert_balanced(&delete);

    let insert = table("a")
        .where_eq("x", 1)
        .to_insert(&BTreeMap::from([("a", 1), ("b", 2), ("c", 3)]))
        .unwrap();
    assert_balanced(&insert);
}
