//! Human-readable labels for raw weather values.

const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-point compass direction, e.g. `"NNE (20°)"`.
pub fn wind_direction(degrees: f64) -> String {
    let index = (degrees.rem_euclid(360.0) / 22.5).round() as usize % COMPASS.len();
    format!("{} ({degrees}°)", COMPASS[index])
}

/// OpenWeather air-quality index bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiLevel {
    Good,
    Fair,
    Moderate,
    Poor,
    VeryPoor,
}

impl AqiLevel {
    /// Unknown indices are reported as good.
    pub fn from_index(aqi: u8) -> Self {
        match aqi {
            2 => AqiLevel::Fair,
            3 => AqiLevel::Moderate,
            4 => AqiLevel::Poor,
            5 => AqiLevel::VeryPoor,
            _ => AqiLevel::Good,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiLevel::Good => "Good",
            AqiLevel::Fair => "Fair",
            AqiLevel::Moderate => "Moderate",
            AqiLevel::Poor => "Poor",
            AqiLevel::VeryPoor => "Very poor",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AqiLevel::Good => "Air quality is satisfactory",
            AqiLevel::Fair => "Air quality is acceptable",
            AqiLevel::Moderate => "Sensitive people may feel minor effects",
            AqiLevel::Poor => "Possible health effects for sensitive groups",
            AqiLevel::VeryPoor => "Health warnings, emergency conditions",
        }
    }
}

/// Name of the moon phase for OpenWeather's `moon_phase` value in `[0, 1]`.
pub fn moon_phase(phase: f64) -> &'static str {
    match phase {
        p if p == 0.0 || p == 1.0 => "New moon",
        p if p < 0.25 => "Waxing crescent",
        p if p == 0.25 => "First quarter",
        p if p < 0.5 => "Waxing gibbous",
        p if p == 0.5 => "Full moon",
        p if p < 0.75 => "Waning gibbous",
        p if p == 0.75 => "Last quarter",
        _ => "Waning crescent",
    }
}

/// Terminal glyph for an OpenWeather icon code such as `"04d"`.
pub fn condition_glyph(icon: &str) -> &'static str {
    match icon {
        "01d" => "☀",
        "01n" => "☾",
        "02d" | "02n" => "⛅",
        "03d" | "03n" | "04d" | "04n" => "☁",
        "09d" | "09n" | "10d" | "10n" => "☂",
        "11d" | "11n" => "⚡",
        "13d" | "13n" => "❄",
        "50d" | "50n" => "≋",
        _ => "?",
    }
}
