use std::sync::{Arc, OnceLock};
use std::thread;

use rust_decimal::Decimal;
use tessera::json::{DecodeErrorKind, Error};
use tessera::{
    Access, CodecOptions, ConfigError, Decoder, Encoder, FieldDecl, PlanCache, Record, Resolver,
    SemanticKind, TypeDecl, Value,
};
use tessera_testhelpers::test;
use time::macros::datetime;

struct Model {
    person: Arc<TypeDecl>,
    employee: Arc<TypeDecl>,
    manager: Arc<TypeDecl>,
    contractor: Arc<TypeDecl>,
    organization: Arc<TypeDecl>,
}

/// `Person` is polymorphic on `role`: 0 is an employee, 1 a manager, 2 a contractor.
fn model() -> Model {
    let roles: Arc<OnceLock<Vec<Arc<TypeDecl>>>> = Arc::default();
    let lookup = Arc::clone(&roles);

    let person = TypeDecl::builder("Person")
        .field(FieldDecl::new("Role", SemanticKind::U8).rename("role").order(-10))
        .field(FieldDecl::new("Name", SemanticKind::String).rename("name").order(-5))
        .field(
            FieldDecl::new("Password", SemanticKind::String)
                .getter(Access::Private)
                .rename("password"),
        )
        .discriminator(
            "Role",
            Resolver::new("PersonByRole", move |v: &Value| {
                let idx = usize::try_from(v.as_u64()?).ok()?;
                lookup.get()?.get(idx).cloned()
            }),
        )
        .build();

    let employee = TypeDecl::builder("Employee")
        .base(&person)
        .field(FieldDecl::new("Salary", SemanticKind::Decimal).rename("salary"))
        .field(FieldDecl::new("Hired", SemanticKind::DateTime).rename("hired"))
        .field(
            FieldDecl::new("Badge", SemanticKind::String)
                .rename("badge")
                .nullable()
                .read_only(),
        )
        .build();

    let manager = TypeDecl::builder("Manager")
        .base(&employee)
        .field(
            FieldDecl::new("Salary", SemanticKind::Decimal)
                .overrides()
                .should_serialize("SalaryIsPublic", |r: &Record| {
                    r.get("Public").and_then(Value::as_bool).unwrap_or(false)
                }),
        )
        .field(FieldDecl::new("Public", SemanticKind::Bool).rename("public"))
        .field(FieldDecl::new("Reports", SemanticKind::U32).rename("reports"))
        .build();

    let contractor = TypeDecl::builder("Contractor")
        .base(&person)
        .field(FieldDecl::new("Agency", SemanticKind::String).rename("agency"))
        .field(FieldDecl::new("Until", SemanticKind::DateTimeOffset).rename("until"))
        .build();

    let _ = roles.set(vec![
        Arc::clone(&employee),
        Arc::clone(&manager),
        Arc::clone(&contractor),
    ]);

    let organization = TypeDecl::builder("Organization")
        .field(FieldDecl::new("Name", SemanticKind::String).rename("name"))
        .field(
            FieldDecl::new("Head", SemanticKind::Object(Arc::clone(&person)))
                .rename("head")
                .nullable(),
        )
        .field(FieldDecl::unclassified("Meta").rename("meta").nullable())
        .build();

    Model {
        person,
        employee,
        manager,
        contractor,
        organization,
    }
}

fn manager_record(m: &Model, public: bool) -> Record {
    Record::new(&m.manager)
        .with("Role", 1u8)
        .with("Name", "Grace")
        .with("Password", "")
        .with("Salary", Decimal::new(250_000, 0))
        .with("Hired", datetime!(1999-12-31 23:59:59))
        .with("Public", public)
        .with("Reports", 12u32)
}

#[test]
fn polymorphic_field_round_trip() {
    let m = model();
    let org = Record::new(&m.organization)
        .with("Name", "Analytical Engines")
        .with("Head", manager_record(&m, true))
        .with("Meta", Value::Null);

    let options = CodecOptions::default();
    let json = tessera::json::to_string(&org, &options).unwrap();
    let decoded = tessera::json::from_str(&m.organization, &json, &options).unwrap();

    // Password has a private getter; Badge is read-only and keeps its default
    let head = decoded.get("Head").and_then(Value::as_record).unwrap();
    assert_eq!(head.ty().name(), "Manager");
    assert_eq!(head.get("Reports"), Some(&Value::U32(12)));
    assert_eq!(head.get("Salary"), Some(&Value::Decimal(Decimal::new(250_000, 0))));
    assert_eq!(head.get("Badge"), Some(&Value::String(String::new())));
    assert_eq!(decoded.get("Meta"), Some(&Value::Null));
}

#[test]
fn encoded_shape() {
    let m = model();
    let org = Record::new(&m.organization)
        .with("Name", "Analytical Engines")
        .with("Head", manager_record(&m, false))
        .with("Meta", Value::Null);

    let options = CodecOptions::new().ignore_null_values();
    let json = tessera::json::to_string_pretty(&org, &options).unwrap();
    insta::assert_snapshot!(json, @r#"
    {
      "head": {
        "role": 1,
        "name": "Grace",
        "hired": "1999-12-31T23:59:59.000000000",
        "public": false,
        "reports": 12
      },
      "name": "Analytical Engines"
    }
    "#);
}

#[test]
fn subtypes_decode_through_the_base() {
    let m = model();
    let decoder = Decoder::new(&m.person).unwrap();

    let employee = decoder
        .decode_str(r#"{"name": "Ada", "salary": 1.5e5, "role": 0, "badge": "A-1"}"#)
        .unwrap();
    assert_eq!(employee.ty().name(), "Employee");
    assert_eq!(employee.get("Salary"), Some(&Value::Decimal(Decimal::new(150_000, 0))));

    let contractor = decoder
        .decode_str(r#"{"role": 2, "agency": "Babbage & Co", "until": "2030-01-01T00:00:00Z"}"#)
        .unwrap();
    assert_eq!(
        contractor,
        Record::new(&m.contractor)
            .with("Role", 2u8)
            .with("Name", "")
            .with("Password", "")
            .with("Agency", "Babbage & Co")
            .with("Until", datetime!(2030-01-01 0:00 UTC))
    );

    match decoder.decode_str(r#"{"role": 9}"#) {
        Err(Error::Decode(e)) => assert!(matches!(
            e.kind,
            DecodeErrorKind::UnresolvedDiscriminator { ref type_name, .. } if type_name == "Person"
        )),
        other => panic!("expected an unresolved discriminator, got {other:?}"),
    }
}

#[test]
fn base_types_cannot_be_encoded_directly() {
    let m = model();
    assert!(matches!(
        Encoder::new(&m.person),
        Err(ConfigError::AbstractEncode { .. })
    ));
    assert!(Encoder::new(&m.employee).is_ok());
}

#[test]
fn plans_are_shared_across_threads() {
    let m = Arc::new(model());
    let input = r#"{"name": "Org", "head": {"role": 1, "name": "Grace", "reports": 3}}"#;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let m = Arc::clone(&m);
            thread::spawn(move || {
                let rec =
                    tessera::json::from_str(&m.organization, input, &CodecOptions::default())
                        .unwrap();
                let head = rec.get("Head").and_then(Value::as_record).cloned().unwrap();
                head.get("Reports").cloned()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(Value::U32(3)));
    }

    let a = PlanCache::global().get_or_plan(&m.manager).unwrap();
    let b = PlanCache::global().get_or_plan(&m.manager).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}
