use bson::{Bson, doc};
use freeform::memory::MemoryDriver;
use freeform::prelude::*;
use serde::{Deserialize, Serialize};

fn mapper() -> Mapper {
    Mapper::new(MemoryDriver::named("test"))
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl Wrap for GeoPoint {
    const TYPE_NAME: &'static str = "GeoPoint";
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Span {
    start: GeoPoint,
    end: GeoPoint,
    label: String,
}

impl Wrap for Span {
    const TYPE_NAME: &'static str = "Span";
}

#[test]
fn wrapped_values_round_trip_as_their_own_type() {
    let mapper = mapper();
    mapper.register_wrap::<GeoPoint>();
    let places = mapper.collection("Place");

    let point = GeoPoint { lat: 51.5, lng: -0.12 };
    let place = places.create();
    place.set("location", Value::object(&point).unwrap()).unwrap();

    let found = places.find_by_id(&place.id().unwrap()).unwrap().unwrap();
    let value = found.get("location").unwrap().unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.type_name(), "GeoPoint");
    assert_eq!(value.downcast_ref::<GeoPoint>(), Some(&point));
    // the wrong type downcasts to nothing
    assert!(value.downcast_ref::<Span>().is_none());
}

#[test]
fn fragments_carry_the_class_tag_in_the_store() {
    let mapper = mapper();
    mapper.register_wrap::<GeoPoint>();
    let places = mapper.collection("Place");

    let place = places.create();
    place
        .set(
            "location",
            Value::object(&GeoPoint { lat: 1.0, lng: 2.0 }).unwrap(),
        )
        .unwrap();

    let raw = places.find_by_id(&place.id().unwrap()).unwrap().unwrap();
    let exported = raw.to_document();
    let Some(Bson::Document(fragment)) = exported.get("location") else {
        panic!("location should be stored as a document");
    };
    assert_eq!(
        fragment.get(CLASS_KEY),
        Some(&Bson::String("GeoPoint".to_string()))
    );
    assert_eq!(fragment.get("lat"), Some(&Bson::Double(1.0)));
}

#[test]
fn unregistered_tags_fail_loudly() {
    let mapper = mapper();
    let places = mapper.collection("Place");

    let place = places.create();
    place
        .set(
            "location",
            Value::object(&GeoPoint { lat: 0.0, lng: 0.0 }).unwrap(),
        )
        .unwrap();

    // no register_wrap call, so the read cannot resolve the tag
    let err = place.get("location").unwrap_err();
    assert!(matches!(err, MapperError::UnresolvedType(name) if name == "GeoPoint"));
}

#[test]
fn wrapped_members_nest_without_extra_tags() {
    let mapper = mapper();
    mapper.register_wrap::<Span>();
    let routes = mapper.collection("Route");

    let span = Span {
        start: GeoPoint { lat: 0.0, lng: 0.0 },
        end: GeoPoint { lat: 1.0, lng: 1.0 },
        label: "leg one".to_string(),
    };
    let route = routes.create();
    route.set("span", Value::object(&span).unwrap()).unwrap();

    let found = routes.find_by_id(&route.id().unwrap()).unwrap().unwrap();
    let value = found.get("span").unwrap().unwrap();
    assert_eq!(value.downcast_ref::<Span>(), Some(&span));

    // only the fragment root is tagged; nested members are plain documents
    let exported = found.to_document();
    let fragment = freeform::value::get_path(&exported, "span.start");
    let Some(Bson::Document(start)) = fragment else {
        panic!("span.start should be a plain document");
    };
    assert!(start.get(CLASS_KEY).is_none());
}

#[test]
fn reassigning_a_foreign_value_writes_the_original_fragment() {
    let mapper = mapper();
    mapper.register_wrap::<GeoPoint>();
    let places = mapper.collection("Place");

    let place = places.create();
    place
        .set(
            "location",
            Value::object(&GeoPoint { lat: 3.0, lng: 4.0 }).unwrap(),
        )
        .unwrap();

    let value = place.get("location").unwrap().unwrap();
    let copy = places.create();
    copy.set("location", value).unwrap();

    let found = places.find_by_id(&copy.id().unwrap()).unwrap().unwrap();
    let read_back = found.get("location").unwrap().unwrap();
    assert_eq!(
        read_back.downcast_ref::<GeoPoint>(),
        Some(&GeoPoint { lat: 3.0, lng: 4.0 })
    );
}

#[test]
fn registrations_are_shared_by_mapper_clones() {
    let mapper = mapper();
    let clone = mapper.clone();
    clone.register_wrap::<GeoPoint>();

    let places = mapper.collection("Place");
    let place = places.create();
    place
        .set(
            "location",
            Value::object(&GeoPoint { lat: 9.0, lng: 9.0 }).unwrap(),
        )
        .unwrap();
    assert!(place.get("location").unwrap().is_some());
}

#[test]
fn reset_clears_registrations() {
    let mapper = mapper();
    mapper.register_wrap::<GeoPoint>();
    let places = mapper.collection("Place");

    let place = places.create();
    place
        .set(
            "location",
            Value::object(&GeoPoint { lat: 5.0, lng: 6.0 }).unwrap(),
        )
        .unwrap();
    assert!(place.get("location").unwrap().is_some());

    mapper.reset();
    assert!(matches!(
        place.get("location"),
        Err(MapperError::UnresolvedType(_))
    ));
}

#[test]
fn arrays_of_values_encode_elementwise() {
    let mapper = mapper();
    mapper.register_wrap::<GeoPoint>();
    let routes = mapper.collection("Route");

    let route = routes.create();
    route
        .set(
            "waypoints",
            Value::Array(vec![
                Value::object(&GeoPoint { lat: 0.0, lng: 0.0 }).unwrap(),
                Value::object(&GeoPoint { lat: 1.0, lng: 1.0 }).unwrap(),
            ]),
        )
        .unwrap();

    let found = routes.find_by_id(&route.id().unwrap()).unwrap().unwrap();
    let value = found.get("waypoints").unwrap().unwrap();
    let waypoints = value.as_list().unwrap();
    assert_eq!(waypoints.len(), 2);
    let second = waypoints.get(1).unwrap().unwrap();
    assert_eq!(
        second.downcast_ref::<GeoPoint>(),
        Some(&GeoPoint { lat: 1.0, lng: 1.0 })
    );
}
