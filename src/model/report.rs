//! Chat-ready text for forecasts (Telegram HTML)

use super::{BasketballForecast, FootballForecast, Forecast};

pub fn format_forecast(forecast: &Forecast) -> String {
    match forecast {
        Forecast::Football(f) => format_football(f),
        Forecast::Basketball(b) => format_basketball(b),
    }
}

fn pct(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}

/// Escape user-supplied text for HTML parse mode
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn format_football(f: &FootballForecast) -> String {
    let home = escape_html(&f.home_team);
    let away = escape_html(&f.away_team);

    let mut text = format!("⚽ <b>Analysis: {} x {}</b>\n\n", home, away);

    text.push_str("<b>Result probabilities</b>\n");
    text.push_str(&format!("• {} win: <code>{}</code>\n", home, pct(f.home_win)));
    text.push_str(&format!("• Draw: <code>{}</code>\n", pct(f.draw)));
    text.push_str(&format!("• {} win: <code>{}</code>\n\n", away, pct(f.away_win)));

    text.push_str("<b>Markets</b>\n");
    text.push_str(&format!(
        "• Most likely score: {}-{} ({:.2}%)\n",
        f.most_likely_score.0,
        f.most_likely_score.1,
        f.most_likely_probability * 100.0
    ));
    for (line, p) in &f.overs {
        text.push_str(&format!("• Over {:.1} goals: <code>{}</code>\n", line, pct(*p)));
    }
    text.push_str(&format!(
        "• Both teams score: <code>{}</code>\n\n",
        pct(f.both_teams_score)
    ));

    text.push_str("<b>Expected goals</b>\n");
    text.push_str(&format!("• {}: {:.2}\n", home, f.lambda_home));
    text.push_str(&format!("• {}: {:.2}\n\n", away, f.lambda_away));

    text.push_str("<i>⚠️ Statistical estimate. Check line-ups and odds before betting.</i>");
    text
}

fn format_basketball(b: &BasketballForecast) -> String {
    let home = escape_html(&b.home_team);
    let away = escape_html(&b.away_team);

    let mut text = format!("🏀 <b>Analysis: {} x {}</b>\n\n", home, away);

    text.push_str("<b>Projected score</b>\n");
    text.push_str(&format!(
        "• {}: {:.1} pts (rating {:.1})\n",
        home, b.expected_home, b.home_offensive_rating
    ));
    text.push_str(&format!(
        "• {}: {:.1} pts (rating {:.1})\n",
        away, b.expected_away, b.away_offensive_rating
    ));
    text.push_str(&format!(
        "• <b>Expected total: {:.1} pts</b>\n\n",
        b.expected_total
    ));

    text.push_str("<b>Totals</b>\n");
    for (threshold, p) in &b.overs {
        text.push_str(&format!("• Over {:.0}: <code>{}</code>\n", threshold, pct(*p)));
    }

    text.push_str("\n<b>Spread</b>\n");
    text.push_str(&format!("• {:+.1} pts\n\n", b.spread));

    text.push_str("<i>⚠️ Rating-based estimate. Check injuries and pace before betting.</i>");
    text
}
