use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub class_id: usize,
    pub label: String,
}

impl Detection {
    pub fn bbox(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection over union with another box, 0 when either box is degenerate.
    pub fn iou(&self, other: &Detection) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        if ix2 <= ix1 || iy2 <= iy1 {
            return 0.0;
        }
        let inter = (ix2 - ix1) * (iy2 - iy1);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }

    pub fn matches_class(&self, name: &str) -> bool {
        self.label.to_lowercase() == name.to_lowercase()
    }
}

/// Outcome of scanning a detection list for a requested class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetMatch {
    pub found: bool,
    pub confidence: f32,
}

/// Scans every detection; the highest-confidence match wins.
pub fn find_target(detections: &[Detection], target: &str) -> TargetMatch {
    detections
        .iter()
        .filter(|d| d.matches_class(target))
        .fold(TargetMatch { found: false, confidence: 0.0 }, |acc, d| TargetMatch {
            found: true,
            confidence: acc.confidence.max(d.score),
        })
}

/// Greedy per-class non-maximum suppression. Survivors come out by descending score.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for det in detections {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == det.class_id && k.iou(&det) > iou_threshold);
        if !suppressed {
            kept.push(det);
        }
    }
    kept
}

pub fn summarize_detections(detections: &[Detection]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for det in detections {
        match counts.iter_mut().find(|entry| entry.0 == det.label) {
            Some((_, n)) => *n += 1,
            None => counts.push((det.label.as_str(), 1)),
        }
    }
    counts
        .iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}
