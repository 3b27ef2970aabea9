//! INAV-style `.mission` XML files.
//!
//! Waypoints are `<missionitem>` elements carrying `no`, `action`, `lat`,
//! `lon` and `alt` attributes. Rewriting a mission only replaces `alt`
//! values; every other event of the document is written back unchanged.

use crate::error::RouteFileError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::str::FromStr;
use wpalt_core::{PlanError, RelativeAltitude, RoutePlan, Waypoint};

const MISSION_ITEM: &[u8] = b"missionitem";

pub fn read_mission(xml: &str) -> Result<Vec<Waypoint>, RouteFileError> {
    let mut reader = Reader::from_str(xml);
    let mut waypoints = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if is_mission_item(&e) => {
                waypoints.push(parse_item(&e)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(waypoints)
}

/// Copy of `xml` with each mission item's `alt` replaced by the planned altitude.
pub fn write_mission(xml: &str, plan: &RoutePlan) -> Result<String, RouteFileError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) if is_mission_item(&e) => {
                writer.write_event(Event::Start(with_altitude(&e, plan)?))?;
            }
            Event::Empty(e) if is_mission_item(&e) => {
                writer.write_event(Event::Empty(with_altitude(&e, plan)?))?;
            }
            event => writer.write_event(event)?,
        }
    }
    Ok(String::from_utf8(writer.into_inner())?)
}

fn is_mission_item(element: &BytesStart<'_>) -> bool {
    element.name().as_ref() == MISSION_ITEM
}

fn parse_item(element: &BytesStart<'_>) -> Result<Waypoint, RouteFileError> {
    let mut number = None;
    let mut action = None;
    let mut lat = None;
    let mut lon = None;
    let mut alt = None;

    for attr in element.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"no" => number = Some(parse_attr::<u32>("no", &value)?),
            b"action" => action = Some(value.trim().to_string()),
            b"lat" => lat = Some(parse_attr::<f64>("lat", &value)?),
            b"lon" => lon = Some(parse_attr::<f64>("lon", &value)?),
            b"alt" => alt = Some(parse_attr::<i32>("alt", &value)?),
            _ => {}
        }
    }

    Ok(Waypoint {
        number: number.ok_or(RouteFileError::MissingAttribute("no"))?,
        action: action.unwrap_or_default(),
        lat: lat.ok_or(RouteFileError::MissingAttribute("lat"))?,
        lon: lon.ok_or(RouteFileError::MissingAttribute("lon"))?,
        altitude: RelativeAltitude(alt.ok_or(RouteFileError::MissingAttribute("alt"))?),
    })
}

fn parse_attr<T: FromStr>(name: &'static str, value: &str) -> Result<T, RouteFileError> {
    value.trim().parse().map_err(|_| RouteFileError::InvalidAttribute {
        name,
        value: value.to_string(),
    })
}

fn with_altitude(element: &BytesStart<'_>, plan: &RoutePlan) -> Result<BytesStart<'static>, RouteFileError> {
    let mut number = None;
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"no" {
            number = Some(parse_attr::<u32>("no", &attr.unescape_value()?)?);
        }
    }
    let number = number.ok_or(RouteFileError::MissingAttribute("no"))?;
    let altitude = plan.altitude_for(number).ok_or_else(|| {
        PlanError::InvalidRoute(format!("mission item #{number} has no planned altitude"))
    })?;

    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut updated = BytesStart::new(name);
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"alt" {
            updated.push_attribute(("alt", altitude.meters().to_string().as_str()));
        } else {
            updated.push_attribute(attr);
        }
    }
    Ok(updated)
}
