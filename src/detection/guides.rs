use serde::{Deserialize, Serialize};

use crate::models::{Anchor, Candidate, GuideRegion, Rect};

/// Where valid detections must lie
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuideLayout {
    /// The whole frame is a single guide
    #[default]
    None,
    /// Four boxes in the frame corners, each `area_ratio` of the frame size;
    /// the bottom pair is lifted by `vertical_offset` of the frame height.
    Corners { area_ratio: f32, vertical_offset: f32 },
    /// Explicit regions in frame pixel coordinates
    Custom { regions: Vec<GuideRegion> },
}

impl GuideLayout {
    /// Corner-marker layout used by the marker scanner screen
    pub fn corners() -> Self {
        Self::Corners {
            area_ratio: 0.2,
            vertical_offset: 0.15,
        }
    }

    /// Guide regions for a frame of the given size; empty for [`GuideLayout::None`]
    pub fn regions(&self, width: u32, height: u32) -> Vec<GuideRegion> {
        match self {
            Self::None => Vec::new(),
            Self::Custom { regions } => regions.clone(),
            Self::Corners {
                area_ratio,
                vertical_offset,
            } => {
                let (w, h) = (width as f32, height as f32);
                let guide_w = w * area_ratio;
                let guide_h = h * area_ratio;
                let bottom_y = (h - guide_h - h * vertical_offset).max(0.0);
                vec![
                    GuideRegion::new("top-left", Rect::new(0.0, 0.0, guide_w, guide_h), Anchor::TopLeft),
                    GuideRegion::new(
                        "top-right",
                        Rect::new(w - guide_w, 0.0, guide_w, guide_h),
                        Anchor::TopRight,
                    ),
                    GuideRegion::new(
                        "bottom-left",
                        Rect::new(0.0, bottom_y, guide_w, guide_h),
                        Anchor::BottomLeft,
                    ),
                    GuideRegion::new(
                        "bottom-right",
                        Rect::new(w - guide_w, bottom_y, guide_w, guide_h),
                        Anchor::BottomRight,
                    ),
                ]
            }
        }
    }
}

/// Rule deciding whether a candidate belongs to a guide region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideAssignment {
    /// The candidate's bounding-box center lies inside the guide
    #[default]
    Centroid,
    /// The candidate's bounding box lies fully inside the guide
    Contained,
}

impl GuideAssignment {
    pub fn accepts(&self, guide: &Rect, candidate: &Rect) -> bool {
        match self {
            Self::Centroid => guide.contains_point(&candidate.center()),
            Self::Contained => guide.contains_rect(candidate),
        }
    }
}

/// Largest candidate by bounding-box area; on ties the earliest one wins
pub fn largest<'a, I>(candidates: I) -> Option<&'a Candidate>
where
    I: IntoIterator<Item = &'a Candidate>,
{
    let mut best: Option<&Candidate> = None;
    for candidate in candidates {
        if best.is_none_or(|b| candidate.rect.area() > b.rect.area()) {
            best = Some(candidate);
        }
    }
    best
}

/// Pick the largest accepted candidate for every guide, in guide order
pub fn assign_to_guides(
    candidates: &[Candidate],
    guides: &[GuideRegion],
    assignment: GuideAssignment,
) -> Vec<Option<Candidate>> {
    guides
        .iter()
        .map(|guide| {
            largest(
                candidates
                    .iter()
                    .filter(|c| assignment.accepts(&guide.bounds, &c.rect)),
            )
            .cloned()
        })
        .collect()
}
