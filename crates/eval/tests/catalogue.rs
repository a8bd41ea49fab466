//! Registry assembled from the vehicles catalogue fixture.

use serde_json::json;
use tessera_core::{Catalogue, CatalogueError, DispatchError, RawRecord, RawValue};
use tessera_eval::{build, flatten, resolve, Registry, Value};

const VEHICLES: &str = include_str!("fixtures/vehicles.catalogue.json");

fn registry() -> Registry {
    let catalogue = Catalogue::from_json_str(VEHICLES).unwrap();
    Registry::from_catalogue(&catalogue).unwrap()
}

fn rec(v: RawValue) -> RawRecord {
    v.as_object().cloned().unwrap()
}

#[test]
fn catalogue_declares_everything() {
    let catalogue = Catalogue::from_json_str(VEHICLES).unwrap();
    assert_eq!(catalogue.type_count(), 6);

    let r = Registry::from_catalogue(&catalogue).unwrap();
    assert_eq!(r.family_names().collect::<Vec<_>>(), vec!["Engine", "Vehicle"]);
    assert_eq!(r.members("Engine"), vec!["Combustion", "Electric"]);
    assert_eq!(r.members("Vehicle"), vec!["Car", "Van"]);
    assert!(r.get_type("Wheel").is_some());
    assert!(r.family_of("Wheel").is_none());
}

#[test]
fn catalogue_predicates_drive_resolution() {
    let r = registry();
    assert_eq!(resolve(&r, "Vehicle", &rec(json!({"type": "Car"}))).unwrap().name, "Car");
    assert_eq!(resolve(&r, "Vehicle", &rec(json!({"num_doors": 4}))).unwrap().name, "Car");
    assert_eq!(resolve(&r, "Vehicle", &rec(json!({"type": "VAN"}))).unwrap().name, "Van");
    assert!(matches!(
        resolve(&r, "Vehicle", &rec(json!({"type": "bicycle"}))),
        Err(DispatchError::NoMatch { .. })
    ));
}

#[test]
fn garage_builds_nested_values() {
    let r = registry();
    let record = rec(json!({
        "name": "Depot",
        "opened": "2019-06-01",
        "vehicles": [
            {"type": "car", "engine": {"kind": "electric", "kwh": 75}, "wheels": [{"size": 17}]},
            {"type": "van", "engine": {"kind": "combustion", "litres": "2.0", "fuel": "diesel"},
             "dimensions": [4.5, 1.9, 2.1]}
        ],
        "limits": {"vans": 3}
    }));
    let garage = build(&r, "Garage", &record).unwrap();
    let vehicles = garage.get("vehicles").and_then(Value::as_list).unwrap();
    let car = vehicles[0].as_object().unwrap();
    let van = vehicles[1].as_object().unwrap();
    assert_eq!(car.type_name, "Car");
    assert_eq!(van.type_name, "Van");

    let wheel = car
        .get("wheels")
        .and_then(Value::as_list)
        .and_then(|w| w.first())
        .and_then(Value::as_object)
        .unwrap();
    assert_eq!(wheel.get("pressure"), Some(&Value::Null));

    let engine = van.get("engine").and_then(Value::as_object).unwrap();
    assert_eq!(engine.type_name, "Combustion");
    assert_eq!(engine.get("fuel"), Some(&Value::Text("diesel".to_string())));
    assert_eq!(
        garage.get("limits"),
        Some(&Value::Map(vec![(Value::Text("vans".to_string()), Value::Int(3))]))
    );

    let flat = flatten(&r, &garage);
    assert_eq!(flat["opened"], json!("2019-06-01"));
    assert_eq!(flat["vehicles"][1]["engine"]["litres"], json!("2.0"));
    assert_eq!(flat["vehicles"][1]["engine"]["kind"], json!("combustion"));
    assert_eq!(build(&r, "Garage", &flat).unwrap(), garage);
}

#[test]
fn garage_errors_name_nested_paths() {
    let r = registry();
    let err = build(
        &r,
        "Garage",
        &rec(json!({
            "name": "Depot",
            "opened": "2019-06-01",
            "vehicles": [{"type": "van", "engine": {"kind": "combustion", "litres": 2, "fuel": "coal"}, "dimensions": [1, 2, 3]}]
        })),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Malformed { ref field, .. } if field == "vehicles[0].engine.fuel"
    ));

    let err = build(
        &r,
        "Garage",
        &rec(json!({"name": "Depot", "opened": "2019-06-01", "vehicles": [], "limits": {"cpu": "many"}})),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Malformed { ref field, .. } if field == "limits{cpu}"
    ));
}

#[test]
fn bad_catalogues_are_rejected() {
    let bad_type = json!({"types": [{"name": "T", "fields": [{"name": "x", "type": "Wheel"}]}]});
    assert!(matches!(
        Catalogue::from_json(&bad_type),
        Err(CatalogueError::FieldType { ref owner, ref field, .. }) if owner == "T" && field == "x"
    ));

    let missing_static = json!({"families": [{
        "name": "Vehicle",
        "discriminators": ["type"],
        "members": [{"name": "Car", "fields": [{"name": "type", "type": "str"}]}]
    }]});
    let catalogue = Catalogue::from_json(&missing_static).unwrap();
    assert!(matches!(
        Registry::from_catalogue(&catalogue),
        Err(CatalogueError::Registration(DispatchError::MissingDiscriminator { .. }))
    ));
}
