//! Renders a [`MapContext`] as text for the chat model and for the UI header.
//!
//! Both functions are pure: same snapshot and configuration, same bytes out.
//! Neither can fail, missing fields are skipped or replaced with a placeholder.

use crate::context_config::{ContextConfig, ContextFieldConfig};
use crate::types::context::MapContext;
use crate::types::osm::{Layer, OsmPoint};

const REGION_NAME: &str = "San Luis Obispo County, CA";

/// Category label used for unnamed items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Restaurant,
    Street,
    Poi,
}

impl Category {
    fn label(self) -> &'static str {
        match self {
            Category::Restaurant => "restaurant",
            Category::Street => "street",
            Category::Poi => "poi",
        }
    }
}

/// Build the delimited map context block for the prompt.
/// Empty when no layer is selected or nothing has been fetched.
pub fn format_for_prompt(context: &MapContext, config: &ContextConfig) -> String {
    let Some(data) = context.data.as_ref() else {
        return String::new();
    };
    if context.selected_layer == Layer::None {
        return String::new();
    }

    let mut out = String::from("\n\n--- MAP CONTEXT ---\n");

    if config.include_location {
        out.push_str(&format!(
            "Location: {REGION_NAME} ({}, {})\n",
            to_fixed(context.latitude(), 4),
            to_fixed(context.longitude(), 4)
        ));
    }
    if config.include_search_radius {
        out.push_str(&format!("Search Radius: {} km\n", to_fixed(context.radius_km(), 1)));
    }
    if config.include_layer_info {
        out.push_str(&format!("Active Layer: {}\n", context.selected_layer));
    }
    out.push('\n');

    let section = match &context.selected_layer {
        Layer::Restaurants => Some((
            "RESTAURANTS",
            "No restaurants found in the search area.",
            data.restaurants.as_deref(),
            Category::Restaurant,
            &config.restaurant_fields,
        )),
        Layer::Streets => Some((
            "STREETS/ROADS",
            "No streets found in the search area.",
            data.streets.as_deref(),
            Category::Street,
            &config.street_fields,
        )),
        Layer::Pois => Some((
            "POINTS OF INTEREST",
            "No POIs found in the search area.",
            data.pois.as_deref(),
            Category::Poi,
            &config.poi_fields,
        )),
        Layer::None => None,
        Layer::Unknown(name) => {
            out.push_str(&format!(
                "{}: No {name} found in the search area.\n",
                name.to_uppercase()
            ));
            None
        }
    };

    if let Some((header, none_found, points, category, fields)) = section {
        match points {
            Some(points) if !points.is_empty() => {
                if config.include_data_count {
                    out.push_str(&format!("{header} ({} found):\n", points.len()));
                } else {
                    out.push_str(&format!("{header}:\n"));
                }
                out.push_str(&format_points(points, category, fields));
            }
            _ => out.push_str(&format!("{header}: {none_found}\n")),
        }
    }

    out.push_str("\n--- END MAP CONTEXT ---\n");
    out
}

/// One-line description of the snapshot for the chat header
pub fn summarize(context: &MapContext, config: &ContextConfig) -> String {
    if context.selected_layer == Layer::None {
        return "No map layer selected".to_string();
    }

    let radius_km = to_fixed(context.radius_km(), 1);
    let mut summary = format!("Viewing {}", context.selected_layer);

    if config.include_location {
        summary.push_str(&format!(
            " within {radius_km}km of ({}, {})",
            to_fixed(context.latitude(), 4),
            to_fixed(context.longitude(), 4)
        ));
    } else {
        summary.push_str(&format!(" within {radius_km}km radius"));
    }

    if config.include_data_count && context.data.is_some() {
        let count = context.active_points().map_or(0, <[OsmPoint]>::len);
        summary.push_str(&format!(" - {count} items found"));
    }

    summary
}

fn format_points(points: &[OsmPoint], category: Category, fields: &ContextFieldConfig) -> String {
    let mut out = String::new();

    for (index, point) in points.iter().take(fields.max_items).enumerate() {
        out.push_str(&format!("{}. ", index + 1));

        if fields.include_name {
            match point.display_name() {
                Some(name) => out.push_str(&format!("**{name}**")),
                None => out.push_str(&format!("*Unnamed {}*", category.label())),
            }
        }

        if fields.include_coordinates {
            if let Some((lat, lon)) = point.position() {
                out.push_str(&format!(" ({}, {})", to_fixed(lat, 4), to_fixed(lon, 4)));
            }
        }

        if fields.include_osm_id {
            out.push_str(&format!(" [ID: {}]", point.osm_id));
        }

        if fields.include_type_details {
            let details = type_details(point, category, fields);
            if !details.is_empty() {
                out.push_str(" - ");
                out.push_str(&details.join(", "));
            }
        }

        out.push('\n');
    }

    if points.len() > fields.max_items {
        out.push_str(&format!("... and {} more items\n", points.len() - fields.max_items));
    }

    out
}

fn type_details(point: &OsmPoint, category: Category, fields: &ContextFieldConfig) -> Vec<String> {
    fn gated(enabled: bool, value: &Option<String>) -> Option<&String> {
        value.as_ref().filter(|_| enabled)
    }

    let tags = &point.tags;

    let candidates: Vec<(&str, Option<&String>)> = match category {
        Category::Restaurant => vec![
            ("Type", point.point_type.as_ref()),
            ("Category", gated(fields.include_amenity, &tags.amenity)),
            ("Cuisine", gated(fields.include_cuisine, &tags.cuisine)),
            ("Brand", gated(fields.include_brand, &tags.brand)),
        ],
        // street details ignore the per-field switches
        Category::Street => vec![
            ("Road Type", tags.highway.as_ref()),
            ("Classification", point.point_type.as_ref()),
        ],
        Category::Poi => vec![
            ("Amenity", gated(fields.include_amenity, &tags.amenity)),
            ("Tourism", tags.tourism.as_ref()),
            ("Shop", tags.shop.as_ref()),
            ("Leisure", tags.leisure.as_ref()),
            ("Natural", tags.natural.as_ref()),
            ("Brand", gated(fields.include_brand, &tags.brand)),
        ],
    };

    candidates
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .filter(|v| !v.is_empty())
                .map(|v| format!("{label}: {v}"))
        })
        .collect()
}

/// Fixed-point rendering with ties rounded away from zero, the way browsers do it.
///
/// `format!("{:.N}")` rounds exact ties to even, so 0.25 would become "0.2"
/// where the browser shows "0.3".
pub fn to_fixed(value: f64, digits: usize) -> String {
    // -0.0 prints without a sign
    let value = if value == 0.0 { 0.0 } else { value };
    if !value.is_finite() {
        return format!("{value}");
    }

    let exact = format!("{:.1100}", value.abs());
    let fraction = exact
        .split_once('.')
        .map_or("", |(_, fraction)| fraction)
        .trim_end_matches('0');

    if fraction.len() == digits + 1 && fraction.ends_with('5') {
        let nudge = 10f64.powi(-(digits as i32 + 2));
        return format!("{:.*}", digits, value + nudge.copysign(value));
    }
    format!("{:.*}", digits, value)
}
