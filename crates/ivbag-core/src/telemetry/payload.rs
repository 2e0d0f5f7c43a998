use core::fmt::Write;

use heapless::String;
use thiserror_no_std::Error;

use crate::scale::Measurement;

/// Number of numeric fields a ThingSpeak channel carries.
pub const FIELD_COUNT: usize = 8;

/// `api_key=<key>` plus eight `&fieldN=<i32>` pairs.
pub const FORM_CAPACITY: usize = 256;

pub const VOLUME_FIELD: usize = 1;
pub const PERCENT_FIELD: usize = 2;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    #[error("field index {0} is outside 1..=8")]
    FieldIndex(usize),
    #[error("encoded form exceeds buffer capacity")]
    Capacity,
}

/// Field values of one channel update. Unset fields are left out of the request.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TelemetryPayload {
    fields: [Option<i32>; FIELD_COUNT],
}

impl TelemetryPayload {
    pub fn from_measurement(measurement: &Measurement) -> Self {
        let mut fields = [None; FIELD_COUNT];
        fields[VOLUME_FIELD - 1] = Some(measurement.volume_ml);
        fields[PERCENT_FIELD - 1] = Some(i32::from(measurement.fill_percent));
        Self { fields }
    }

    /// Fields are numbered from 1, as on the channel.
    pub fn set_field(&mut self, index: usize, value: i32) -> Result<(), PayloadError> {
        let slot = index
            .checked_sub(1)
            .and_then(|i| self.fields.get_mut(i))
            .ok_or(PayloadError::FieldIndex(index))?;
        *slot = Some(value);
        Ok(())
    }

    pub fn field(&self, index: usize) -> Option<i32> {
        index
            .checked_sub(1)
            .and_then(|i| self.fields.get(i).copied())
            .flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.iter().all(Option::is_none)
    }

    /// `(index, value)` of every set field, in field order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, i32)> + '_ {
        self.fields
            .iter()
            .enumerate()
            .filter_map(|(i, value)| value.map(|v| (i + 1, v)))
    }

    /// `application/x-www-form-urlencoded` body for a channel update.
    pub fn encode_form(&self, write_key: &str) -> Result<String<FORM_CAPACITY>, PayloadError> {
        let mut form = String::new();
        form.push_str("api_key").map_err(|_| PayloadError::Capacity)?;
        form.push('=').map_err(|_| PayloadError::Capacity)?;
        push_url_encoded(&mut form, write_key)?;
        for (index, value) in self.iter() {
            write!(form, "&field{}={}", index, value).map_err(|_| PayloadError::Capacity)?;
        }
        Ok(form)
    }
}

fn push_url_encoded<const N: usize>(out: &mut String<N>, text: &str) -> Result<(), PayloadError> {
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out
                .push(char::from(byte))
                .map_err(|_| PayloadError::Capacity)?,
            _ => write!(out, "%{:02X}", byte).map_err(|_| PayloadError::Capacity)?,
        }
    }
    Ok(())
}
