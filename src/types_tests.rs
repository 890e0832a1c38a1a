//! Tests for core types

#[cfg(test)]
mod tests {
    use super::super::types::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn user(vip: bool, expires_in: Option<Duration>) -> User {
        let now = Utc::now();
        User {
            id: 1,
            credits: 0,
            vip,
            vip_expires_at: expires_in.map(|d| now + d),
            created_at: now,
        }
    }

    #[test]
    fn test_sport_parsing_aliases() {
        assert_eq!("football".parse::<Sport>().unwrap(), Sport::Football);
        assert_eq!("Futebol".parse::<Sport>().unwrap(), Sport::Football);
        assert_eq!(" soccer ".parse::<Sport>().unwrap(), Sport::Football);
        assert_eq!("BASQUETE".parse::<Sport>().unwrap(), Sport::Basketball);
        assert_eq!("nba".parse::<Sport>().unwrap(), Sport::Basketball);
        assert!("hockey".parse::<Sport>().is_err());
    }

    #[test]
    fn test_sport_serialization() {
        assert_eq!(serde_json::to_string(&Sport::Football).unwrap(), "\"football\"");
        assert_eq!(Sport::Basketball.to_string(), "basketball");
    }

    #[test]
    fn test_vip_active_only_before_expiry() {
        let now = Utc::now();
        assert!(user(true, Some(Duration::days(1))).is_vip_active(now));
        assert!(!user(true, Some(Duration::days(-1))).is_vip_active(now));
        assert!(!user(true, None).is_vip_active(now));
        assert!(!user(false, Some(Duration::days(1))).is_vip_active(now));
    }

    #[test]
    fn test_vip_days_left_rounds_up() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let mut u = user(true, None);

        u.vip_expires_at = Some(now + Duration::days(30));
        assert_eq!(u.vip_days_left(now), 30);

        u.vip_expires_at = Some(now + Duration::hours(1));
        assert_eq!(u.vip_days_left(now), 1);

        u.vip_expires_at = Some(now - Duration::hours(1));
        assert_eq!(u.vip_days_left(now), 0);
    }

    #[test]
    fn test_league_average_profiles() {
        assert_eq!(
            TeamRatings::league_average(Sport::Football),
            TeamRatings::Football {
                avg_goals_for: 1.5,
                avg_goals_against: 1.2
            }
        );
        let profile = ScoringProfile::league_average("Unknown FC", Sport::Basketball);
        assert_eq!(profile.team_name, "Unknown FC");
        assert_eq!(profile.sport(), Sport::Basketball);
        assert_eq!(
            profile.ratings,
            TeamRatings::Basketball {
                offensive_rating: 113.5,
                defensive_rating: 111.2
            }
        );
    }

    #[test]
    fn test_team_ratings_tagged_serialization() {
        let json = serde_json::to_value(TeamRatings::league_average(Sport::Football)).unwrap();
        assert_eq!(json["sport"], "football");
        assert_eq!(json["avg_goals_for"], 1.5);
    }

    #[test]
    fn test_external_reference_format() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let reference = external_reference(PaymentKind::Credits, 42, at);
        assert_eq!(reference, "credits-42-1700000000123");
        assert_eq!(
            parse_external_reference(&reference),
            Some((PaymentKind::Credits, 42, 1_700_000_000_123))
        );
    }

    #[test]
    fn test_parse_external_reference_rejects_garbage() {
        assert!(parse_external_reference("gift-1-2").is_none());
        assert!(parse_external_reference("vip-abc-2").is_none());
        assert!(parse_external_reference("vip").is_none());
    }

    #[test]
    fn test_pending_payment_record() {
        let at = Utc.timestamp_millis_opt(1_000).unwrap();
        let record = PaymentRecord::pending(7, PaymentKind::Vip, dec!(29.90), 0, at);
        assert_eq!(record.status, PaymentStatus::Pending);
        assert_eq!(record.external_reference, "vip-7-1000");
    }

    #[test]
    fn test_payment_enum_strings_roundtrip() {
        for kind in [PaymentKind::Vip, PaymentKind::Credits] {
            assert_eq!(kind.as_str().parse::<PaymentKind>().unwrap(), kind);
        }
        for status in [PaymentStatus::Pending, PaymentStatus::Confirmed] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("refunded".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_chat_event_tagged_union() {
        let event: ChatEvent = serde_json::from_str(
            r#"{"kind":"command","name":"futebol","args":"A x B","userId":1,"chatId":2}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ChatEvent::Command {
                name: "futebol".to_string(),
                args: "A x B".to_string(),
                user_id: 1,
                chat_id: 2,
            }
        );
        assert_eq!(event.user_id(), 1);
        assert_eq!(event.chat_id(), 2);

        let button = ChatEvent::Button {
            data: "buy:vip".to_string(),
            user_id: 3,
            chat_id: 4,
        };
        let json = serde_json::to_value(&button).unwrap();
        assert_eq!(json["kind"], "button");
        assert_eq!(json["userId"], 3);

        assert!(serde_json::from_str::<ChatEvent>(r#"{"kind":"sticker","userId":1}"#).is_err());
    }
}
