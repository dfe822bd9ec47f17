use serde::{Deserialize, Serialize};

/// Placement of one clip on a unit's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    /// Clip placed at this position.
    #[serde(rename = "video_id")]
    pub clip_id: String,
    /// Offset of the clip's first frame within the unit, in seconds.
    pub start_time: f64,
    /// Offset just past the clip's last frame, in seconds.
    pub end_time: f64,
}

/// One accepted concatenation unit, as consumed by the muxing and annotation
/// stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcatUnit {
    /// Zero-based index in emission order.
    pub unit_id: usize,
    /// File name the muxer writes the unit to.
    pub concat_video: String,
    /// Sum of member durations; equal to the last boundary's `end_time`.
    pub total_duration: f64,
    /// Gap-free, full-clip timeline starting at zero.
    pub boundaries: Vec<Boundary>,
    /// Member clip ids in placement order.
    #[serde(rename = "videos")]
    pub members: Vec<String>,
}

impl ConcatUnit {
    /// Lays `clips` (id, duration) out end to end.
    pub fn from_clips<'a, I>(unit_id: usize, clips: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut boundaries = Vec::new();
        let mut members = Vec::new();
        let mut cursor = 0.0;
        for (id, duration) in clips {
            let end_time = cursor + duration;
            boundaries.push(Boundary {
                clip_id: id.to_string(),
                start_time: cursor,
                end_time,
            });
            members.push(id.to_string());
            cursor = end_time;
        }
        Self {
            unit_id,
            concat_video: video_name(unit_id),
            total_duration: cursor,
            boundaries,
            members,
        }
    }

    /// Number of clips in the unit.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Checks the timeline invariants: starts at zero, no gaps, member list
    /// matches the boundaries, no clip twice, total equals the last end.
    pub fn is_well_formed(&self) -> bool {
        let mut cursor = 0.0;
        for boundary in &self.boundaries {
            if boundary.start_time != cursor || boundary.end_time <= boundary.start_time {
                return false;
            }
            cursor = boundary.end_time;
        }
        let ids_match = self
            .boundaries
            .iter()
            .map(|boundary| boundary.clip_id.as_str())
            .eq(self.members.iter().map(String::as_str));
        let mut seen = std::collections::BTreeSet::new();
        let distinct = self.members.iter().all(|id| seen.insert(id.as_str()));
        ids_match && distinct && cursor == self.total_duration
    }
}

/// Output file name of the unit with the given index.
pub fn video_name(unit_id: usize) -> String {
    format!("concat_{unit_id:05}.mp4")
}
