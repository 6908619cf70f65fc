// assets.rs — 全景图 / ID 图成对加载（后台线程解码，通道回传）

use image::io::Reader as ImageReader;
use image::RgbaImage;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

use crate::error::AssetError;
use crate::raster::RasterPair;

/// Identifies one load request. Only the newest generation of a room may be committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    pub room: usize,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetRequest {
    pub ticket: LoadTicket,
    /// Composite asset name derived from the room's variant selections.
    pub name: String,
    pub panorama: PathBuf,
    pub id_map: PathBuf,
}

#[derive(Debug)]
pub struct LoadResult {
    pub ticket: LoadTicket,
    pub result: Result<RasterPair, AssetError>,
}

/// Fetches raster pairs without blocking the caller. Completions come back
/// later as [`LoadResult`]s, through whatever channel the provider owns.
pub trait AssetProvider {
    fn request(&mut self, request: AssetRequest);

    /// The request's result is no longer wanted.
    fn cancel(&mut self, _ticket: LoadTicket) {}
}

/// Loads from the filesystem, one worker thread per request.
pub struct FsAssetProvider {
    tx: Sender<LoadResult>,
}

impl FsAssetProvider {
    pub fn new() -> (Self, Receiver<LoadResult>) {
        let (tx, rx) = channel();
        (Self { tx }, rx)
    }
}

impl AssetProvider for FsAssetProvider {
    fn request(&mut self, request: AssetRequest) {
        let tx = self.tx.clone();
        thread::spawn(move || {
            log::info!("Loading {} in background: {:?}", request.name, request.panorama);
            let result = load_pair(&request);
            if tx
                .send(LoadResult {
                    ticket: request.ticket,
                    result,
                })
                .is_err()
            {
                log::warn!("Loader result for {} dropped: receiver gone", request.name);
            }
        });
    }

    fn cancel(&mut self, ticket: LoadTicket) {
        // 线程无法中断，结果回来后由 session 丢弃
        log::debug!("Cancelled load {:?}", ticket);
    }
}

/// Decode both halves of a pair. All-or-nothing: either half failing fails the pair.
pub fn load_pair(request: &AssetRequest) -> Result<RasterPair, AssetError> {
    let panorama = decode(&request.panorama).map_err(|e| match e {
        DecodeFailure::Open(reason) => AssetError::PanoramaMissing {
            path: request.panorama.clone(),
            reason,
        },
        DecodeFailure::Decode(reason) => AssetError::PanoramaDecode {
            path: request.panorama.clone(),
            reason,
        },
    })?;
    let id_map = decode(&request.id_map).map_err(|e| match e {
        DecodeFailure::Open(reason) => AssetError::IdMapMissing {
            path: request.id_map.clone(),
            reason,
        },
        DecodeFailure::Decode(reason) => AssetError::IdMapDecode {
            path: request.id_map.clone(),
            reason,
        },
    })?;

    let (w, h) = panorama.dimensions();
    log::info!("Loaded {}: {}x{}", request.name, w, h);
    RasterPair::new(request.name.clone(), panorama, id_map)
}

enum DecodeFailure {
    Open(String),
    Decode(String),
}

fn decode(path: &Path) -> Result<RgbaImage, DecodeFailure> {
    let file = File::open(path).map_err(|e| DecodeFailure::Open(e.to_string()))?;
    let reader = BufReader::new(file);

    ImageReader::new(reader)
        .with_guessed_format()
        .map_err(image::ImageError::IoError)
        .and_then(|mut r| {
            r.no_limits();
            r.decode()
        })
        .map(|img| img.to_rgba8())
        .map_err(|e| DecodeFailure::Decode(e.to_string()))
}
