mod common;

use common::{setup, Customer, OrderLine};
use recordset_core::{Entity, FieldMap, Ident, Record, RecordService};
use rusqlite::types::Value;
use std::rc::Rc;

#[test]
fn new_record_keeps_supplied_fields_and_defaults_the_rest() {
    let conn = setup();
    let service = RecordService::<Customer>::new(&conn);

    let fields = FieldMap::new().with("name", Value::Text("ada".to_string()));
    let record = service.new_record(&fields);

    assert_eq!(record.id, None);
    assert_eq!(record.name, "ada");

    let empty = service.new_record(&FieldMap::new());
    assert_eq!(empty.name, "");
}

#[test]
fn get_by_scalar_returns_the_same_instance_per_key() {
    let conn = setup();
    let service = RecordService::<Customer>::new(&conn);
    let saved = service
        .save_one(Record::Instance(Customer::named("ada")))
        .expect("insert should succeed");
    let id = saved.borrow().id.expect("insert assigns an id");

    let first = service
        .get(id)
        .expect("get should succeed")
        .expect("row should exist");
    let second = service
        .get(id)
        .expect("get should succeed")
        .expect("row should exist");

    assert!(Rc::ptr_eq(&saved, &first));
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(first.borrow().name, "ada");
}

#[test]
fn get_by_key_map_is_equivalent_to_scalar() {
    let conn = setup();
    let service = RecordService::<Customer>::new(&conn);
    let saved = service
        .save_one(Record::Instance(Customer::named("grace")))
        .expect("insert should succeed");
    let id = saved.borrow().id.expect("insert assigns an id");

    let by_scalar = service
        .get(id)
        .expect("get should succeed")
        .expect("row should exist");
    let by_map = service
        .get(FieldMap::new().with("id", Value::Integer(id)))
        .expect("get should succeed")
        .expect("row should exist");

    assert!(Rc::ptr_eq(&by_scalar, &by_map));
}

#[test]
fn get_composite_key_by_tuple_and_map() {
    let conn = setup();
    let service = RecordService::<OrderLine>::new(&conn);
    service
        .save_one(Record::Instance(OrderLine::keyed(7, 2, "widget")))
        .expect("insert should succeed");

    let by_tuple = service
        .get(vec![Value::Integer(7), Value::Integer(2)])
        .expect("get should succeed")
        .expect("row should exist");
    assert_eq!(by_tuple.borrow().name, "widget");

    let by_map = service
        .get(
            FieldMap::new()
                .with("order_id", Value::Integer(7))
                .with("line_no", Value::Integer(2)),
        )
        .expect("get should succeed")
        .expect("row should exist");
    assert!(Rc::ptr_eq(&by_tuple, &by_map));
}

#[test]
fn get_returns_none_for_malformed_or_absent_identities() {
    let conn = setup();
    let service = RecordService::<Customer>::new(&conn);

    // Absent keys.
    assert!(service.get(10i64).expect("get should not error").is_none());
    assert!(service.get(-1i64).expect("get should not error").is_none());

    // Malformed shapes resolve to not-found, not errors.
    assert!(service
        .get(Ident::Null)
        .expect("get should not error")
        .is_none());
    assert!(service.get("").expect("get should not error").is_none());
    assert!(service
        .get(Ident::Scalar(Value::Null))
        .expect("get should not error")
        .is_none());
    assert!(service
        .get(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)])
        .expect("get should not error")
        .is_none());
    assert!(service
        .get(FieldMap::new())
        .expect("get should not error")
        .is_none());
}

#[test]
fn get_returns_none_for_wrong_arity_against_composite_key() {
    let conn = setup();
    let service = RecordService::<OrderLine>::new(&conn);
    service
        .save_one(Record::Instance(OrderLine::keyed(1, 1, "widget")))
        .expect("insert should succeed");

    // Scalar against a two-column key cannot resolve.
    assert!(service.get(1i64).expect("get should not error").is_none());
    // Key map missing one column cannot resolve either.
    assert!(service
        .get(FieldMap::new().with("order_id", Value::Integer(1)))
        .expect("get should not error")
        .is_none());
}

#[test]
fn instance_identity_follows_key_population() {
    let transient = Customer::named("no key yet");
    assert!(transient.identity().is_none());

    let keyed = Customer {
        id: Some(42),
        name: "keyed".to_string(),
    };
    let key = keyed.identity().expect("populated key should resolve");
    assert_eq!(key.0, vec![Value::Integer(42)]);
}
