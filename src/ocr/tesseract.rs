use image::GrayImage;
use rayon::prelude::*;
use std::path::PathBuf;
use tesseract::{PageSegMode, Tesseract};

use super::{
    preprocess::binarize, Extractor, ExtractorFactory, OcrResult, Recognizer, RegionExtractor,
};
use crate::config::RegionKind;
use crate::error::ExtractError;

const PSMS: &[PageSegMode] = &[
    PageSegMode::PsmSingleLine,
    PageSegMode::PsmSingleWord,
    PageSegMode::PsmRawLine,
];

/// Character whitelist per field kind.
fn whitelist(kind: RegionKind) -> &'static str {
    match kind {
        RegionKind::Score => "0123456789/.",
        RegionKind::Team => "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
        RegionKind::Text => "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz. ",
    }
}

/// Tesseract over the binarized crop.
///
/// A fresh `Tesseract` handle is created for every call; handles are never
/// reused, so recognizers on different workers share no engine state.
pub struct TesseractRecognizer {
    pub languages: Vec<String>,
    pub tessdata_dir: Option<String>,
}

impl Recognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract/binary"
    }

    fn recognize(
        &self,
        crop: &image::DynamicImage,
        kind: RegionKind,
    ) -> Result<Option<OcrResult>, ExtractError> {
        let lang = build_lang(&self.languages);
        let img = binarize(crop, kind);
        Ok(run_psms(&img, self.tessdata_dir.as_deref(), &lang, kind).map(|(text, confidence)| {
            OcrResult { text, confidence, engine_name: format!("{}/{kind:?}", self.name()) }
        }))
    }
}

/// Run all `PSMS` in parallel and return the highest-confidence result.
fn run_psms(
    img: &GrayImage,
    datadir: Option<&str>,
    lang: &str,
    kind: RegionKind,
) -> Option<(String, f64)> {
    let (w, h) = img.dimensions();
    let bytes = img.as_raw();
    PSMS.par_iter()
        .filter_map(|&psm| try_ocr(bytes, w, h, datadir, lang, psm, kind).ok())
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

/// Call Tesseract for one PSM on an 8-bit grayscale buffer.
fn try_ocr(
    bytes: &[u8],
    w: u32,
    h: u32,
    datadir: Option<&str>,
    lang: &str,
    psm: PageSegMode,
    kind: RegionKind,
) -> Result<(String, f64), ()> {
    let mut tess = Tesseract::new(datadir, Some(lang))
        .map_err(|_| ())?
        .set_variable("tessedit_char_whitelist", whitelist(kind))
        .map_err(|_| ())?
        .set_variable("load_system_dawg", "F")
        .map_err(|_| ())?
        .set_variable("load_freq_dawg", "F")
        .map_err(|_| ())?
        .set_frame(bytes, w as i32, h as i32, 1, w as i32)
        .map_err(|_| ())?;
    tess.set_page_seg_mode(psm);
    let mut tess = tess.recognize().map_err(|_| ())?;

    let raw = tess.get_text().map_err(|_| ())?;
    let trimmed = raw.trim().to_string();
    if trimmed.is_empty() {
        return Err(());
    }

    let conf = tess.mean_text_conf().max(0) as f64 / 100.0;
    Ok((trimmed, conf))
}

fn build_lang(languages: &[String]) -> String {
    if languages.is_empty() {
        return "eng".to_string();
    }
    languages
        .iter()
        .map(|l| match l.trim() {
            "en" | "eng" => "eng",
            other => other,
        })
        .collect::<Vec<_>>()
        .join("+")
}

/// Hands each worker its own Tesseract-backed `RegionExtractor`.
pub struct TesseractFactory {
    pub tessdata_dir: Option<PathBuf>,
    pub languages: Vec<String>,
}

impl TesseractFactory {
    fn datadir(&self) -> Option<String> {
        self.tessdata_dir.as_ref().map(|d| d.to_string_lossy().to_string())
    }
}

impl ExtractorFactory for TesseractFactory {
    fn create(&self) -> Result<Box<dyn Extractor>, ExtractError> {
        let datadir = self.datadir();
        let lang = build_lang(&self.languages);

        // Fail the whole run up front if the engine can't start here.
        Tesseract::new(datadir.as_deref(), Some(&lang))
            .map_err(|e| ExtractError::Unsupported(format!("tesseract init ({lang}): {e}")))?;

        Ok(Box::new(RegionExtractor::new(vec![Box::new(TesseractRecognizer {
            languages: self.languages.clone(),
            tessdata_dir: datadir,
        })])))
    }
}
