//! Kestrel log row parsing and re-serialization.
//!
//! Rows lead with seven fixed columns: timestamp, temperature (F), relative humidity,
//! station pressure (inHg), heat index, dew point (F) and density altitude (ft). Anything
//! after those is carried along untouched.

use crate::error::{FixError, FixResult};

/// Number of fixed leading columns in a data row.
pub const LEADING_FIELDS: usize = 7;

const TEMPERATURE: usize = 1;
const PRESSURE: usize = 3;
const DEW_POINT: usize = 5;
const DENSITY_ALTITUDE: usize = 6;

const FIELD_NAMES: [&str; LEADING_FIELDS] = [
    "timestamp",
    "temperature",
    "relative humidity",
    "station pressure",
    "heat index",
    "dew point",
    "density altitude",
];

/// A decoded data row.
///
/// The original text of every field is kept so untouched columns are written back exactly
/// as they were read.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    leading: [String; LEADING_FIELDS],
    trailing: Vec<String>,
    pub temp_f: f64,
    pub press_inhg: f64,
    pub dew_point_f: f64,
}

impl DataRow {
    pub fn timestamp(&self) -> &str {
        &self.leading[0]
    }

    /// Recorded density altitude field, as text.
    pub fn raw_altitude(&self) -> &str {
        &self.leading[DENSITY_ALTITUDE]
    }

    /// Recorded density altitude in feet.
    pub fn raw_altitude_ft(&self) -> FixResult<f64> {
        parse_field(&self.leading, DENSITY_ALTITUDE)
    }

    pub fn trailing(&self) -> &[String] {
        &self.trailing
    }

    /// Total number of comma separated fields in the row.
    pub fn field_count(&self) -> usize {
        LEADING_FIELDS + self.trailing.len()
    }
}

fn parse_field(fields: &[String; LEADING_FIELDS], idx: usize) -> FixResult<f64> {
    let text = &fields[idx];
    text.trim().parse::<f64>().map_err(|_| {
        FixError::malformed(0, format!("{} '{}' is not a number", FIELD_NAMES[idx], text))
    })
}

/// Decode a raw data row.
///
/// Row errors carry line 0; callers that know the row position restamp them.
pub fn decode(row: &str) -> FixResult<DataRow> {
    // Plain comma split: quotes, carriage returns and BOMs are field content here.
    let fields: Vec<&str> = row.split(',').collect();
    if fields.len() < LEADING_FIELDS {
        return Err(FixError::malformed(
            0,
            format!(
                "expected at least {} fields, found {}",
                LEADING_FIELDS,
                fields.len()
            ),
        ));
    }

    let leading: [String; LEADING_FIELDS] = std::array::from_fn(|i| fields[i].to_string());
    let trailing = fields[LEADING_FIELDS..].iter().map(|f| f.to_string()).collect();

    let temp_f = parse_field(&leading, TEMPERATURE)?;
    let press_inhg = parse_field(&leading, PRESSURE)?;
    let dew_point_f = parse_field(&leading, DEW_POINT)?;

    Ok(DataRow {
        leading,
        trailing,
        temp_f,
        press_inhg,
        dew_point_f,
    })
}

/// Encode a row with a replacement density altitude.
pub fn encode(row: &DataRow, new_altitude_ft: f64) -> String {
    encode_text(row, &format_altitude(new_altitude_ft))
}

/// Encode a row with the altitude field given as text.
pub fn encode_text(row: &DataRow, altitude: &str) -> String {
    let mut fields: Vec<&str> = Vec::with_capacity(row.field_count());
    fields.extend(row.leading[..DENSITY_ALTITUDE].iter().map(String::as_str));
    fields.push(altitude);
    fields.extend(row.trailing.iter().map(String::as_str));
    fields.join(",")
}

/// Plain decimal rendering: shortest round-trip digits, no exponent.
pub fn format_altitude(altitude_ft: f64) -> String {
    format!("{}", altitude_ft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE_LOG_LINE: &str = "2024-04-29 13:37:52,69.8,32.6,28.16,67.3,39.1,2863,point";

    #[test]
    fn decodes_sample_line() {
        let row = decode(SAMPLE_LOG_LINE).unwrap();
        assert_eq!(row.timestamp(), "2024-04-29 13:37:52");
        assert_eq!(row.temp_f, 69.8);
        assert_eq!(row.press_inhg, 28.16);
        assert_eq!(row.dew_point_f, 39.1);
        assert_eq!(row.raw_altitude(), "2863");
        assert_eq!(row.raw_altitude_ft().unwrap(), 2863.0);
        assert_eq!(row.trailing(), ["point".to_string()]);
    }

    #[test]
    fn encode_replaces_only_altitude() {
        let row = decode(SAMPLE_LOG_LINE).unwrap();
        assert_eq!(
            encode(&row, 2874.5),
            "2024-04-29 13:37:52,69.8,32.6,28.16,67.3,39.1,2874.5,point"
        );
    }

    #[test]
    fn untouched_fields_keep_their_text() {
        let line = "t,070.10,32,28.160,67.30,39.10,2863";
        let row = decode(line).unwrap();
        assert_eq!(encode(&row, 1.0), "t,070.10,32,28.160,67.30,39.10,1");
    }

    #[test]
    fn trailing_fields_round_trip() {
        let line = "t,69.8,32.6,28.16,67.3,39.1,2863,point,,Record 1,\"quoted\",";
        let row = decode(line).unwrap();
        assert_eq!(row.field_count(), 12);
        assert_eq!(encode(&row, 2863.0), line);
    }

    #[test]
    fn carriage_return_and_bom_stay_in_their_fields() {
        let line = "\u{feff}t,69.8,32.6,28.16,67.3,39.1,2863,a\rb,Record 1,notes";
        let row = decode(line).unwrap();
        assert_eq!(row.timestamp(), "\u{feff}t");
        assert_eq!(row.field_count(), 10);
        assert_eq!(encode(&row, 2863.0), line);
    }

    #[test]
    fn raw_altitude_text_is_written_back_verbatim() {
        let row = decode("t,69.8,32.6,28.16,67.3,39.1,2863.50,point").unwrap();
        assert_eq!(encode_text(&row, row.raw_altitude()), "t,69.8,32.6,28.16,67.3,39.1,2863.50,point");
    }

    #[test]
    fn too_few_fields_is_malformed() {
        let err = decode("2024-04-29 13:37:52,69.8,32.6,28.16,67.3,39.1").unwrap_err();
        assert!(matches!(err, FixError::MalformedRow { .. }));
        assert!(decode("").is_err());
    }

    #[test]
    fn non_numeric_fields_are_malformed() {
        for line in [
            "t,hot,32.6,28.16,67.3,39.1,2863",
            "t,69.8,32.6,,67.3,39.1,2863",
            "t,69.8,32.6,28.16,67.3,dry,2863",
        ] {
            let err = decode(line).unwrap_err();
            assert!(matches!(err, FixError::MalformedRow { .. }), "{line}");
        }
    }

    #[test]
    fn passthrough_fields_are_not_validated() {
        let row = decode("t,69.8,--,28.16,n/a,39.1,----").unwrap();
        assert!(row.raw_altitude_ft().is_err());
    }

    #[test]
    fn altitude_formatting_is_plain_decimal() {
        assert_eq!(format_altitude(2863.0), "2863");
        assert_eq!(format_altitude(-12.25), "-12.25");
        assert_eq!(format_altitude(1e21), "1000000000000000000000");
        assert_eq!(format_altitude(f64::NAN), "NaN");
    }

    proptest! {
        #[test]
        fn decode_encode_keeps_non_altitude_fields(
            temp in -40.0f64..130.0,
            press in 15.0f64..32.0,
            dew in -40.0f64..90.0,
            altitude in -5000.0f64..30000.0,
            trailing in prop::collection::vec("[A-Za-z0-9 :._\"\r\u{feff}-]{0,10}", 0..6),
        ) {
            let mut fields = vec![
                "\u{feff}2024-04-29 13:37:52".to_string(),
                temp.to_string(),
                "32.6".to_string(),
                press.to_string(),
                "67.3".to_string(),
                dew.to_string(),
                "2863".to_string(),
            ];
            fields.extend(trailing.iter().cloned());
            let line = fields.join(",");

            let row = decode(&line).unwrap();
            let encoded = encode(&row, altitude);
            let out: Vec<&str> = encoded.split(',').collect();

            prop_assert_eq!(out.len(), fields.len());
            for (i, (a, b)) in out.iter().zip(fields.iter()).enumerate() {
                if i != DENSITY_ALTITUDE {
                    prop_assert_eq!(*a, b.as_str());
                }
            }
            prop_assert_eq!(out[DENSITY_ALTITUDE].parse::<f64>().unwrap(), altitude);
        }
    }
}
