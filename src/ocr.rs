pub mod preprocess;
#[cfg(feature = "tesseract")]
pub mod tesseract;

use crate::config::{labels, RegionKind, RoiConfig};
use self::preprocess::has_strike_arrow;
use crate::error::ExtractError;
use crate::snapshot::is_valid_team_name;
use crate::video::Frame;
use image::{DynamicImage, RgbImage};
use std::collections::HashMap;

// ── Public types ─────────────────────────────────────────────────────────────

/// Result produced by a single `Recognizer` for one crop.
#[derive(Debug, Clone, Default)]
pub struct OcrResult {
    pub text: String,
    pub confidence: f64,     // 0.0 – 1.0
    pub engine_name: String, // e.g. "tesseract/score"
}

/// Every OCR backend implements this.
/// `recognize` receives the pre-cropped RGB region plus the kind of field it
/// holds, so a backend can restrict its character set.
pub trait Recognizer {
    fn name(&self) -> &str;
    fn recognize(
        &self,
        crop: &DynamicImage,
        kind: RegionKind,
    ) -> Result<Option<OcrResult>, ExtractError>;
}

/// Frame + label → region map in, label → recognized text out.
/// Labels that could not be read are omitted.
///
/// Instances are not shared: every worker gets its own from an
/// [`ExtractorFactory`].
pub trait Extractor {
    fn extract(
        &mut self,
        frame: &Frame,
        roi: &RoiConfig,
    ) -> Result<HashMap<String, String>, ExtractError>;
}

/// Builds one `Extractor` per worker.  A failure here is fatal for the run.
pub trait ExtractorFactory: Sync {
    fn create(&self) -> Result<Box<dyn Extractor>, ExtractError>;
}

// ── Region extractor ─────────────────────────────────────────────────────────

/// Crops each configured region and runs it through the recognizers,
/// keeping the most confident non-empty reading.
///
/// The batting-team region is read first: when it doesn't look like a team
/// code the frame is a replay or an overlay and the other regions are skipped.
///
/// Batter plates are assigned by the strike arrow: when exactly one plate
/// shows it, that name becomes `Batter1` (on strike) and the other `Batter2`.
/// Otherwise the names keep their configured slots.
pub struct RegionExtractor {
    engines: Vec<Box<dyn Recognizer>>,
}

impl RegionExtractor {
    pub fn new(engines: Vec<Box<dyn Recognizer>>) -> Self {
        Self { engines }
    }

    /// Clip and crop `label`'s region out of the frame.
    fn crop_region(
        image: &RgbImage,
        roi: &RoiConfig,
        label: &str,
    ) -> Option<(DynamicImage, RegionKind)> {
        let region = roi.get(label)?;
        let Some((x, y, w, h)) = region.clip(image.width(), image.height()) else {
            let (fw, fh) = image.dimensions();
            log::debug!("[ocr] region {label} lies outside the {fw}×{fh} frame");
            return None;
        };
        let crop = image::imageops::crop_imm(image, x, y, w, h).to_image();
        Some((DynamicImage::ImageRgb8(crop), region.kind))
    }

    fn recognize(
        &self,
        crop: &DynamicImage,
        kind: RegionKind,
        label: &str,
    ) -> Result<Option<String>, ExtractError> {
        let mut results = Vec::with_capacity(self.engines.len());
        for engine in &self.engines {
            if let Some(r) = engine.recognize(crop, kind)? {
                results.push(r);
            }
        }

        for r in &results {
            log::trace!(
                "[ocr]  {:20} {:12} {:?} conf={:.3}",
                r.engine_name, label, r.text, r.confidence
            );
        }

        Ok(best_result(&results).map(|r| r.text.trim().to_string()))
    }

    fn read_region(
        &self,
        image: &RgbImage,
        roi: &RoiConfig,
        label: &str,
    ) -> Result<Option<String>, ExtractError> {
        match Self::crop_region(image, roi, label) {
            Some((crop, kind)) => self.recognize(&crop, kind, label),
            None => Ok(None),
        }
    }
}

impl Extractor for RegionExtractor {
    fn extract(
        &mut self,
        frame: &Frame,
        roi: &RoiConfig,
    ) -> Result<HashMap<String, String>, ExtractError> {
        let mut fields = HashMap::new();
        let Some(image) = frame.to_image() else {
            return Ok(fields);
        };

        if roi.get(labels::BATTING_TEAM).is_some() {
            match self.read_region(&image, roi, labels::BATTING_TEAM)? {
                Some(team) if is_valid_team_name(&team) => {
                    fields.insert(labels::BATTING_TEAM.to_string(), team);
                }
                other => {
                    log::debug!("[ocr] team field {other:?} rejected, skipping frame");
                    return Ok(HashMap::new());
                }
            }
        }

        let mut plates = Vec::with_capacity(2);
        for (label, _) in roi.iter().filter(|(l, _)| *l != labels::BATTING_TEAM) {
            let Some((crop, kind)) = Self::crop_region(&image, roi, label) else {
                continue;
            };
            let text = self.recognize(&crop, kind, label)?;
            if label == labels::BATTER1 || label == labels::BATTER2 {
                plates.push(BatterPlate { label, name: text, on_strike: has_strike_arrow(&crop) });
            } else if let Some(text) = text {
                fields.insert(label.to_string(), text);
            }
        }
        assign_batters(&mut fields, plates);

        Ok(fields)
    }
}

struct BatterPlate<'a> {
    label: &'a str,
    name: Option<String>,
    on_strike: bool,
}

fn assign_batters(fields: &mut HashMap<String, String>, plates: Vec<BatterPlate<'_>>) {
    let arrows = plates.iter().filter(|p| p.on_strike).count();
    for plate in plates {
        let Some(name) = plate.name else {
            continue;
        };
        let slot = match (arrows, plate.on_strike) {
            (1, true) => labels::BATTER1,
            (1, false) => labels::BATTER2,
            _ => plate.label,
        };
        if slot != plate.label {
            log::trace!("[ocr] {slot} read from {} (strike arrow)", plate.label);
        }
        fields.insert(slot.to_string(), name);
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Highest-confidence result with non-blank text.
fn best_result(results: &[OcrResult]) -> Option<&OcrResult> {
    results
        .iter()
        .filter(|r| !r.text.trim().is_empty())
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}
