//! Minimal NMEA 0183 position extraction (GGA and RMC sentences)

use autonomia_shared::Readings;

/// Update `readings` from one NMEA sentence.
/// Returns true if the sentence was recognized and applied.
pub fn apply_sentence(line: &str, readings: &mut Readings) -> bool {
    let Some(body) = checked_body(line) else {
        return false;
    };

    let fields: Vec<&str> = body.split(',').collect();
    let kind = fields[0];
    if kind.len() != 5 {
        return false;
    }

    // Talker id is two characters; noise may leave multi-byte chars here
    match kind.get(2..).unwrap_or_default() {
        "GGA" if fields.len() >= 10 => {
            let fix = fields[6].parse::<u8>().unwrap_or(0) > 0;
            readings.fix = fix;
            readings.satellites = fields[7].parse().unwrap_or(0);
            if let Ok(alt) = fields[9].parse() {
                readings.alt = alt;
            }
            if fix {
                apply_position(readings, fields[2], fields[3], fields[4], fields[5]);
            }
            true
        }
        "RMC" if fields.len() >= 8 => {
            let fix = fields[2] == "A";
            readings.fix = fix;
            if fix {
                apply_position(readings, fields[3], fields[4], fields[5], fields[6]);
                readings.speed = fields[7].parse().unwrap_or(0.0);
            }
            true
        }
        _ => false,
    }
}

fn apply_position(readings: &mut Readings, lat: &str, ns: &str, lon: &str, ew: &str) {
    if let (Some(lat), Some(lon)) = (coordinate(lat, ns, 2), coordinate(lon, ew, 3)) {
        readings.lat = lat;
        readings.lon = lon;
    }
}

/// `ddmm.mmmm` / `dddmm.mmmm` plus hemisphere to signed decimal degrees
fn coordinate(value: &str, hemisphere: &str, degree_digits: usize) -> Option<f64> {
    if value.len() <= degree_digits {
        return None;
    }
    let degrees: f64 = value.get(..degree_digits)?.parse().ok()?;
    let minutes: f64 = value.get(degree_digits..)?.parse().ok()?;
    let decimal = degrees + minutes / 60.0;

    match hemisphere {
        "N" | "E" => Some(decimal),
        "S" | "W" => Some(-decimal),
        _ => None,
    }
}

/// Strip `$` and the `*hh` checksum, verifying it when present
fn checked_body(line: &str) -> Option<&str> {
    let line = line.trim().strip_prefix('$')?;

    match line.split_once('*') {
        Some((body, checksum)) => {
            let expected = u8::from_str_radix(checksum.get(..2)?, 16).ok()?;
            let actual = body.bytes().fold(0u8, |acc, b| acc ^ b);
            (expected == actual).then_some(body)
        }
        None => Some(line),
    }
}
