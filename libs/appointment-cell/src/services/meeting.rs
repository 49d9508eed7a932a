// libs/appointment-cell/src/services/meeting.rs
use rand::Rng;

use crate::models::VIDEO_CONSULTATION;

const ROOM_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ROOM_ID_LEN: usize = 10;

/// Issues join links for remote consultations.
#[derive(Debug, Clone)]
pub struct MeetingLinkGenerator {
    base_url: String,
}

impl MeetingLinkGenerator {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_remote(location: &str) -> bool {
        location == VIDEO_CONSULTATION
    }

    /// A fresh room for video consultations, `None` for in-person visits.
    pub fn link_for(&self, location: &str) -> Option<String> {
        if Self::is_remote(location) {
            Some(format!("{}/{}", self.base_url, Self::room_id()))
        } else {
            None
        }
    }

    pub fn room_id() -> String {
        let mut rng = rand::thread_rng();
        (0..ROOM_ID_LEN)
            .map(|_| ROOM_ALPHABET[rng.gen_range(0..ROOM_ALPHABET.len())] as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_consultation_gets_link_under_base() {
        let generator = MeetingLinkGenerator::new("https://meet.jit.si/");
        let link = generator.link_for(VIDEO_CONSULTATION).unwrap();

        let room = link.strip_prefix("https://meet.jit.si/").unwrap();
        assert_eq!(room.len(), ROOM_ID_LEN);
        assert!(room.bytes().all(|b| ROOM_ALPHABET.contains(&b)));
        assert!(reqwest::Url::parse(&link).is_ok());
    }

    #[test]
    fn in_person_visit_has_no_link() {
        let generator = MeetingLinkGenerator::new("https://meet.jit.si");
        assert_eq!(generator.link_for("Main Clinic"), None);
        assert_eq!(generator.link_for("video consultation"), None);
    }

    #[test]
    fn rooms_differ() {
        assert_ne!(MeetingLinkGenerator::room_id(), MeetingLinkGenerator::room_id());
    }
}
