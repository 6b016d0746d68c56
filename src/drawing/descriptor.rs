//! Persisted drawing form: a flat record with abbreviated keys.
//!
//! Absent fields are omitted on output and default to `None` on input, so
//! descriptors written by one variant never carry another variant's keys.

use serde::{Deserialize, Serialize};

use crate::core::anchor::DurableAnchor;
use crate::core::layout::Interval;
use crate::drawing::params::FibParameters;
use crate::error::{DrawingError, DrawingResult};
use crate::interaction::AnchorSlot;
use crate::render::{FontSpec, LinePattern};

/// Durable callout stem position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StemDescriptor {
    pub d: String,
    #[serde(default)]
    pub tzo: i32,
    pub v: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptrn: Option<LinePattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lw: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub d0: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tzo0: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tzo1: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tzo2: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v0: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v2: Option<f64>,

    /// Gartley intermediate points, `d,tzo,v` triples joined by commas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pts: Option<String>,
    /// Freeform node offsets, flattened `x,y` pairs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mlt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inter: Option<Interval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pd: Option<u32>,

    /// Shape angle in degrees and scale factors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sx: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sy: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev1: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev2: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev3: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col3: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptrn1: Option<LinePattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptrn2: Option<LinePattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptrn3: Option<LinePattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lw1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lw2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lw3: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub al: Option<bool>,

    /// Speed line options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fnt: Option<FontSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stem: Option<StemDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<FibParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callout: Option<Box<DrawingDescriptor>>,
}

impl DrawingDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> DrawingResult<String> {
        serde_json::to_string(self).map_err(|err| DrawingError::Codec(err.to_string()))
    }

    pub fn from_json(json: &str) -> DrawingResult<Self> {
        serde_json::from_str(json).map_err(|err| DrawingError::Codec(err.to_string()))
    }

    /// Writes the `d`/`tzo`/`v` triple of one anchor slot.
    pub fn set_anchor(&mut self, slot: AnchorSlot, anchor: Option<DurableAnchor>) {
        let date = anchor.map(DurableAnchor::date_string);
        let offset = anchor.map(|a| a.utc_offset_minutes);
        let value = anchor.map(|a| a.value);
        match slot {
            AnchorSlot::P0 => {
                self.d0 = date;
                self.tzo0 = offset;
                self.v0 = value;
            }
            AnchorSlot::P1 => {
                self.d1 = date;
                self.tzo1 = offset;
                self.v1 = value;
            }
            AnchorSlot::P2 => {
                self.d2 = date;
                self.tzo2 = offset;
                self.v2 = value;
            }
        }
    }

    /// Reads the durable anchor of a slot; `Ok(None)` when its date is absent.
    pub fn anchor(&self, slot: AnchorSlot) -> DrawingResult<Option<DurableAnchor>> {
        let (date, offset, value) = match slot {
            AnchorSlot::P0 => (&self.d0, self.tzo0, self.v0),
            AnchorSlot::P1 => (&self.d1, self.tzo1, self.v1),
            AnchorSlot::P2 => (&self.d2, self.tzo2, self.v2),
        };
        let Some(date) = date else {
            return Ok(None);
        };
        let value = value.ok_or_else(|| {
            DrawingError::descriptor(&self.name, format!("anchor {} has a date but no value", slot.index()))
        })?;
        DurableAnchor::from_parts(date, offset.unwrap_or(0), value)
            .map(Some)
            .map_err(|err| DrawingError::descriptor(&self.name, err.to_string()))
    }

    /// Like [`Self::anchor`] but a missing anchor is an error.
    pub fn require_anchor(&self, slot: AnchorSlot) -> DrawingResult<DurableAnchor> {
        self.anchor(slot)?.ok_or_else(|| {
            DrawingError::descriptor(&self.name, format!("missing anchor {}", slot.index()))
        })
    }

    pub(crate) fn panel_name(&self) -> DrawingResult<&str> {
        match self.pnl.as_deref() {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(DrawingError::descriptor(&self.name, "missing panel name")),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::DrawingDescriptor;
    use crate::core::anchor::DurableAnchor;
    use crate::interaction::AnchorSlot;

    #[test]
    fn absent_fields_are_omitted() {
        let mut desc = DrawingDescriptor::new("segment");
        desc.pnl = Some("chart".to_owned());
        let json = desc.to_json().expect("json");
        assert_eq!(json, r#"{"name":"segment","pnl":"chart"}"#);
    }

    #[test]
    fn anchors_round_trip_through_abbreviated_keys() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|d| d.and_hms_milli_opt(9, 30, 0, 250))
            .expect("date");
        let anchor = DurableAnchor {
            date,
            utc_offset_minutes: 300,
            value: 101.5,
        };
        let mut desc = DrawingDescriptor::new("channel");
        desc.set_anchor(AnchorSlot::P2, Some(anchor));
        assert_eq!(desc.d2.as_deref(), Some("20240305093000250"));
        let parsed = DrawingDescriptor::from_json(&desc.to_json().expect("json")).expect("parse");
        assert_eq!(parsed.anchor(AnchorSlot::P2).expect("anchor"), Some(anchor));
        assert_eq!(parsed.anchor(AnchorSlot::P0).expect("anchor"), None);
    }

    #[test]
    fn date_without_value_is_rejected() {
        let mut desc = DrawingDescriptor::new("segment");
        desc.d0 = Some("20240101".to_owned());
        assert!(desc.anchor(AnchorSlot::P0).is_err());
        assert!(desc.require_anchor(AnchorSlot::P1).is_err());
    }

    #[test]
    fn malformed_json_is_a_codec_error() {
        let err = DrawingDescriptor::from_json("{not json").expect_err("invalid");
        assert!(matches!(err, crate::error::DrawingError::Codec(_)));
    }
}
