// src/geocode.rs
//! Country/region → coordinates. A built-in gazetteer covers the countries
//! that recur in outbreak bulletins (saves API calls); everything else falls
//! through to the Mapbox forward-geocoding API when a token is configured.
//!
//! "Not found" is a normal outcome (`None`), never an error. Transport
//! failures are logged and collapse to `None` as well; the caller just skips
//! location creation.

use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[async_trait]
pub trait Geocode: Send + Sync {
    async fn geocode(&self, country: &str, region: Option<&str>) -> Option<Coordinates>;
}

/// (country, longitude, latitude)
const COUNTRY_COORDS: &[(&str, f64, f64)] = &[
    ("Afghanistan", 69.17, 34.55),
    ("Angola", 17.87, -11.20),
    ("Argentina", -58.38, -34.60),
    ("Bangladesh", 90.36, 23.68),
    ("Brazil", -47.93, -15.78),
    ("Burkina Faso", -1.52, 12.37),
    ("Burundi", 29.92, -3.37),
    ("Cambodia", 104.92, 11.56),
    ("Cameroon", 11.52, 3.87),
    ("Central African Republic", 18.56, 4.39),
    ("Chad", 15.04, 12.13),
    ("China", 104.20, 35.86),
    ("Colombia", -74.07, 4.71),
    ("Comoros", 43.34, -11.70),
    ("Democratic Republic of the Congo", 21.76, -4.04),
    ("DR Congo", 21.76, -4.04),
    ("Djibouti", 43.15, 11.59),
    ("Ecuador", -78.47, -0.18),
    ("Egypt", 31.24, 30.04),
    ("Ethiopia", 38.75, 9.01),
    ("Ghana", -1.02, 7.95),
    ("Guinea", -13.68, 9.65),
    ("Haiti", -72.29, 18.97),
    ("India", 78.96, 20.59),
    ("Indonesia", 106.85, -6.21),
    ("Iran", 53.69, 32.43),
    ("Iraq", 44.37, 33.31),
    ("Israel", 34.85, 32.11),
    ("Jordan", 35.93, 31.96),
    ("Kenya", 36.82, -1.29),
    ("Lebanon", 35.50, 33.89),
    ("Liberia", -10.80, 6.43),
    ("Libya", 13.18, 32.89),
    ("Madagascar", 46.87, -18.77),
    ("Malawi", 34.30, -13.97),
    ("Mali", -8.00, 12.64),
    ("Mauritania", -15.98, 18.07),
    ("Mexico", -99.13, 19.43),
    ("Morocco", -7.09, 31.79),
    ("Mozambique", 35.53, -25.97),
    ("Myanmar", 96.20, 16.87),
    ("Nepal", 85.32, 27.72),
    ("Niger", 2.11, 13.51),
    ("Nigeria", 7.49, 9.06),
    ("Pakistan", 67.00, 30.38),
    ("Palestine", 34.31, 31.35),
    ("Papua New Guinea", 147.18, -6.31),
    ("Peru", -77.04, -12.05),
    ("Philippines", 120.98, 14.60),
    ("Rwanda", 29.87, -1.94),
    ("Saudi Arabia", 45.08, 23.89),
    ("Senegal", -17.47, 14.69),
    ("Sierra Leone", -13.23, 8.48),
    ("Somalia", 45.34, 2.05),
    ("South Africa", 28.03, -26.20),
    ("South Sudan", 31.60, 6.88),
    ("Sri Lanka", 80.77, 7.87),
    ("Sudan", 32.53, 15.50),
    ("Syria", 38.99, 34.80),
    ("Tanzania", 34.89, -6.37),
    ("Thailand", 100.99, 15.87),
    ("Togo", 1.17, 6.17),
    ("Uganda", 32.29, 1.37),
    ("United States", -95.71, 37.09),
    ("United States of America", -95.71, 37.09),
    ("Venezuela", -66.90, 10.49),
    ("Viet Nam", 108.28, 14.06),
    ("Vietnam", 108.28, 14.06),
    ("Yemen", 44.21, 15.37),
    ("Zambia", 28.28, -15.39),
    ("Zimbabwe", 29.15, -19.02),
];

fn gazetteer_lookup(country: &str) -> Option<Coordinates> {
    COUNTRY_COORDS
        .iter()
        .find(|(name, _, _)| *name == country)
        .map(|(_, lon, lat)| Coordinates {
            latitude: *lat,
            longitude: *lon,
        })
}

/// Production geocoder: gazetteer first, Mapbox second.
pub struct CountryGeocoder {
    mapbox_token: Option<String>,
    client: reqwest::Client,
}

impl CountryGeocoder {
    pub fn new(mapbox_token: Option<String>) -> Self {
        Self {
            mapbox_token,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MapboxResponse {
    #[serde(default)]
    features: Vec<MapboxFeature>,
}

#[derive(Debug, Deserialize)]
struct MapboxFeature {
    /// [longitude, latitude]
    center: Option<[f64; 2]>,
}

#[async_trait]
impl Geocode for CountryGeocoder {
    async fn geocode(&self, country: &str, region: Option<&str>) -> Option<Coordinates> {
        if let Some(coords) = gazetteer_lookup(country) {
            return Some(coords);
        }

        let Some(token) = self.mapbox_token.as_deref() else {
            tracing::warn!(country, "no Mapbox token for geocoding");
            counter!("geocode_misses_total").increment(1);
            return None;
        };

        let query = match region {
            Some(r) => format!("{r}, {country}"),
            None => country.to_string(),
        };
        let url = format!(
            "https://api.mapbox.com/geocoding/v5/mapbox.places/{}.json",
            urlencode(&query)
        );

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("access_token", token),
                ("types", "country,region,place"),
                ("limit", "1"),
            ])
            .send()
            .await;

        let parsed: Option<MapboxResponse> = match resp {
            Ok(r) if r.status().is_success() => r.json().await.ok(),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = ?e, %query, "geocoding request failed");
                None
            }
        };

        let coords = parsed
            .and_then(|p| p.features.into_iter().next())
            .and_then(|f| f.center)
            .map(|[lon, lat]| Coordinates {
                latitude: lat,
                longitude: lon,
            });

        if coords.is_none() {
            counter!("geocode_misses_total").increment(1);
        }
        coords
    }
}

/// Percent-encode a geocoding query path segment.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => {
                use std::fmt::Write as _;
                let _ = write!(&mut out, "%{b:02X}");
            }
        }
    }
    out
}
