//! Railway infrastructure types shared by the `osrd_infra` migrations.

use serde_json::{json, Map, Value};

/// Version of the railjson format new infras are created with.
pub const RAILJSON_VERSION: &str = "2.2.2";

/// Railway clearance-envelope categories constraining rolling-stock dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingGaugeType {
    G1,
    G2,
    GA,
    GB,
    GB1,
    GC,
    FR3_3,
}

impl LoadingGaugeType {
    pub const ALL: [LoadingGaugeType; 7] = [
        LoadingGaugeType::G1,
        LoadingGaugeType::G2,
        LoadingGaugeType::GA,
        LoadingGaugeType::GB,
        LoadingGaugeType::GB1,
        LoadingGaugeType::GC,
        LoadingGaugeType::FR3_3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadingGaugeType::G1 => "G1",
            LoadingGaugeType::G2 => "G2",
            LoadingGaugeType::GA => "GA",
            LoadingGaugeType::GB => "GB",
            LoadingGaugeType::GB1 => "GB1",
            LoadingGaugeType::GC => "GC",
            LoadingGaugeType::FR3_3 => "FR3.3",
        }
    }

    pub fn domain() -> Vec<String> {
        Self::ALL.iter().map(|gauge| gauge.as_str().to_string()).collect()
    }
}

fn enumeration(title: &str, values: &[&str]) -> Value {
    json!({
        "description": "An enumeration.",
        "enum": values,
        "title": title,
        "type": "string"
    })
}

fn range_with(title: &str, field: &str) -> Value {
    json!({
        "properties": {
            "begin": {"title": "Begin", "type": "number"},
            "end": {"title": "End", "type": "number"},
            field: {"title": capitalize(field), "type": "number"}
        },
        "required": [field, "begin", "end"],
        "title": title,
        "type": "object"
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn line_string() -> Value {
    let coordinate = json!({"anyOf": [{"type": "number"}, {"type": "integer"}]});
    let position = |size: usize| {
        let items = vec![coordinate.clone(); size];
        json!({
            "items": items,
            "maxItems": size,
            "minItems": size,
            "type": "array"
        })
    };

    json!({
        "description": "LineString Model",
        "properties": {
            "coordinates": {
                "items": {"anyOf": [position(2), position(3)]},
                "minItems": 2,
                "title": "Coordinates",
                "type": "array"
            },
            "type": {"const": "LineString", "title": "Type", "type": "string"}
        },
        "required": ["coordinates"],
        "title": "LineString",
        "type": "object"
    })
}

fn base_definitions() -> Map<String, Value> {
    let mut definitions = Map::new();
    definitions.insert("Curve".to_string(), range_with("Curve", "radius"));
    definitions.insert("LineString".to_string(), line_string());
    definitions.insert("Slope".to_string(), range_with("Slope", "gradient"));
    definitions
}

fn base_properties() -> Map<String, Value> {
    let mut properties = Map::new();
    for (name, property) in [
        ("curves", json!({"items": {"$ref": "#/definitions/Curve"}, "title": "Curves", "type": "array"})),
        ("geo", json!({"$ref": "#/definitions/LineString"})),
        ("id", json!({"maxLength": 255, "title": "Id", "type": "string"})),
        ("length", json!({"title": "Length", "type": "number"})),
        ("line_code", json!({"title": "Line Code", "type": "integer"})),
        ("line_name", json!({"maxLength": 255, "title": "Line Name", "type": "string"})),
        ("sch", json!({"$ref": "#/definitions/LineString"})),
        ("slopes", json!({"items": {"$ref": "#/definitions/Slope"}, "title": "Slopes", "type": "array"})),
        ("track_name", json!({"maxLength": 255, "title": "Track Name", "type": "string"})),
        ("track_number", json!({"title": "Track Number", "type": "integer"})),
    ] {
        properties.insert(name.to_string(), property);
    }
    properties
}

fn track_section_document(
    definitions: Map<String, Value>,
    properties: Map<String, Value>,
    required: &[&str],
) -> Value {
    json!({
        "definitions": definitions,
        "properties": properties,
        "required": required,
        "title": "TrackSection",
        "type": "object"
    })
}

/// Track section validator installed by the initial migration.
pub fn track_section_schema_v1() -> Value {
    track_section_document(
        base_definitions(),
        base_properties(),
        &[
            "geo",
            "sch",
            "id",
            "length",
            "line_code",
            "line_name",
            "track_number",
            "track_name",
            "slopes",
            "curves",
        ],
    )
}

/// Track section validator with navigability and loading gauge limits.
pub fn track_section_schema() -> Value {
    let gauges: Vec<&str> = LoadingGaugeType::ALL.iter().map(|gauge| gauge.as_str()).collect();

    let mut definitions = base_definitions();
    definitions.insert(
        "ApplicableDirections".to_string(),
        enumeration(
            "ApplicableDirections",
            &["START_TO_STOP", "STOP_TO_START", "BOTH"],
        ),
    );
    definitions.insert(
        "ApplicableTrainType".to_string(),
        enumeration("ApplicableTrainType", &["FREIGHT", "PASSENGER"]),
    );
    definitions.insert(
        "LoadingGaugeLimit".to_string(),
        json!({
            "properties": {
                "applicable_train_type": {"$ref": "#/definitions/ApplicableTrainType"},
                "begin": {"title": "Begin", "type": "number"},
                "category": {"$ref": "#/definitions/LoadingGaugeType"},
                "end": {"title": "End", "type": "number"}
            },
            "required": ["category", "begin", "end", "applicable_train_type"],
            "title": "LoadingGaugeLimit",
            "type": "object"
        }),
    );
    definitions.insert(
        "LoadingGaugeType".to_string(),
        enumeration("LoadingGaugeType", &gauges),
    );

    let mut properties = base_properties();
    properties.insert(
        "loading_gauge_limits".to_string(),
        json!({
            "items": {"$ref": "#/definitions/LoadingGaugeLimit"},
            "title": "Loading Gauge Limits",
            "type": "array"
        }),
    );
    properties.insert(
        "navigability".to_string(),
        json!({"$ref": "#/definitions/ApplicableDirections"}),
    );

    track_section_document(
        definitions,
        properties,
        &[
            "geo",
            "sch",
            "id",
            "length",
            "line_code",
            "line_name",
            "track_number",
            "track_name",
            "navigability",
            "slopes",
            "curves",
        ],
    )
}
