// SPDX-License-Identifier: MIT

//! Gemini itinerary generation: prompt construction and the
//! `generateContent` REST call.

use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

use crate::error::AppError;
use crate::models::TravelCompanion;

const GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";
// Generation is by far the slowest outbound call
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything the prompt needs, already validated.
#[derive(Debug, Clone)]
pub struct ItineraryRequest {
    pub destination: String,
    pub days: u32,
    pub interest: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: Option<f64>,
    pub travel_companion: Option<TravelCompanion>,
}

/// Gemini generation client.
#[derive(Clone)]
pub struct GenerationClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl GenerationClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// Generate a formatted itinerary. Single attempt; a timeout is the
    /// same failure as an unreachable service.
    pub async fn generate(
        &self,
        request: &ItineraryRequest,
        places: &[String],
    ) -> Result<String, AppError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            AppError::Unavailable("itinerary generation is not configured".to_string())
        })?;

        let prompt = build_prompt(request, places);

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http
            .post(GENERATE_URL)
            .timeout(HTTP_TIMEOUT)
            .query(&[("key", api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Unavailable(format!("generation request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Unavailable(format!(
                "generation service returned status {}",
                response.status()
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Unavailable(format!("invalid generation response: {e}")))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AppError::Unavailable(
                "generation service returned no content".to_string(),
            ));
        }

        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Build the generation prompt: a strict emoji-formatted day plan plus a
/// booking-resources section with pre-filled travel dates.
pub fn build_prompt(request: &ItineraryRequest, places: &[String]) -> String {
    let ItineraryRequest {
        destination,
        days,
        interest,
        start_date,
        end_date,
        budget,
        travel_companion,
    } = request;

    let display_start = start_date.format("%B %-d, %Y");
    let display_end = end_date.format("%B %-d, %Y");
    let depart = start_date.format("%Y-%m-%d");
    let ret = end_date.format("%Y-%m-%d");
    let dest_enc = urlencoding::encode(destination);

    let budget_info = match budget {
        Some(b) => format!("Budget: ₹{b}"),
        None => "Budget: Not specified".to_string(),
    };
    let companion_info = match travel_companion {
        Some(c) => format!("Travel Group: {c:?}"),
        None => "Travel Group: Not specified".to_string(),
    };

    let place_suggestions = if places.is_empty() {
        String::new()
    } else {
        let list = places
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{}. {}", i + 1, name))
            .collect::<Vec<_>>()
            .join("\n");
        format!("Here are some suggested places to consider incorporating into the itinerary:\n{list}\n\n")
    };

    let budget_tip = match budget {
        Some(b) => format!(
            "- Suggest budget-friendly options within ₹{b} for {days} days"
        ),
        None => "- Include a mix of free and paid activities".to_string(),
    };

    format!(
        "Create a detailed {days}-day travel itinerary for {destination} with a focus on {interest}.\n\
Travel Dates: {display_start} to {display_end}\n\
{companion_info}\n\
{budget_info}\n\
\n\
{place_suggestions}\
IMPORTANT FORMATTING REQUIREMENTS:\n\
Use this EXACT modern, user-friendly format with emojis and clear structure:\n\
\n\
══════════════════════════════════════════════\n\
📅 DAY 1: [Catchy Day Title]\n\
══════════════════════════════════════════════\n\
\n\
🌅 MORNING (8:00 AM - 12:00 PM)\n\
📍 [Activity/Place Name]\n\
   ⏰ Time: [Time range]\n\
   💡 Tip: [Brief helpful tip]\n\
\n\
🌞 AFTERNOON (12:00 PM - 6:00 PM)\n\
📍 [Activity/Place Name]\n\
   ⏰ Time: [Time range]\n\
   💡 Tip: [Brief helpful tip]\n\
\n\
🌆 EVENING (6:00 PM - 10:00 PM)\n\
📍 [Activity/Place Name]\n\
   ⏰ Time: [Time range]\n\
   💡 Tip: [Brief helpful tip]\n\
\n\
[Repeat this format for all {days} days]\n\
\n\
AT THE END, ADD THIS EXACT SECTION:\n\
\n\
══════════════════════════════════════════════\n\
🎫 BOOKING RESOURCES\n\
══════════════════════════════════════════════\n\
\n\
✈️ FLIGHTS ({display_start} - {display_end})\n\
🔗 Google Flights: https://www.google.com/travel/flights?q=flights%20to%20{dest_enc}%20on%20{depart}\n\
\n\
🏨 HOTELS & ACCOMMODATION ({display_start} - {display_end})\n\
🔗 Booking.com: https://www.booking.com/searchresults.html?ss={dest_enc}&checkin={depart}&checkout={ret}\n\
🔗 Airbnb: https://www.airbnb.co.in/s/{dest_enc}/homes?checkin={depart}&checkout={ret}\n\
\n\
💡 TIPS:\n\
- Book flights 2-3 months in advance for best prices\n\
- Check cancellation policies before booking\n\
- These links are pre-filled with your travel dates for convenience\n\
\n\
GUIDELINES:\n\
- Use relevant emojis throughout\n\
- Keep descriptions concise and engaging (2-3 sentences max per activity)\n\
- Include specific times and realistic durations\n\
- Focus on {interest} activities\n\
{budget_tip}\n\
- Use the exact formatting with ═══ lines for visual separation\n\
\n\
Important: Start IMMEDIATELY with the formatted itinerary. NO introductory text. \
Begin directly with the first ═══ separator and Day 1."
    )
}
