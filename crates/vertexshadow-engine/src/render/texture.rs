//! Asynchronous texture loading and the upload/filtering policy.
//!
//! Decoding happens on a worker thread. The result comes back through a
//! oneshot channel and is uploaded on the render thread the next time the
//! resource is polled.

use std::path::PathBuf;

use futures::channel::oneshot;
use image::RgbaImage;

use crate::gl::{GraphicsApi, TextureFilter};

#[derive(Debug, thiserror::Error)]
pub enum TextureLoadError {
    #[error("texture source `{0}` is not supported; use a local path or file:// URL")]
    UnsupportedSource(String),

    #[error("failed to read texture `{path}`")]
    Io {
        path: String,
        #[source]
        error: std::io::Error,
    },

    #[error("failed to decode texture `{path}`")]
    Decode {
        path: String,
        #[source]
        error: image::ImageError,
    },

    #[error("could not start texture loader thread")]
    Spawn(#[source] std::io::Error),

    #[error("texture load for `{0}` was abandoned before completing")]
    Abandoned(String),

    #[error("texture is {width}x{height}; the device accepts at most {max} per side")]
    TooLarge { width: u32, height: u32, max: u32 },
}

type LoadResult = Result<RgbaImage, TextureLoadError>;

/// In-flight load. Dropping it discards the result when it arrives.
#[derive(Debug)]
pub struct PendingTexture {
    source: String,
    receiver: oneshot::Receiver<LoadResult>,
}

impl PendingTexture {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Wraps an externally produced result channel.
    pub fn from_receiver(source: impl Into<String>, receiver: oneshot::Receiver<LoadResult>) -> Self {
        Self {
            source: source.into(),
            receiver,
        }
    }
}

/// Starts decoding `source` on a worker thread. `on_complete` runs on that
/// thread after the result has been sent.
pub fn request_load<F>(source: &str, on_complete: F) -> Result<PendingTexture, TextureLoadError>
where
    F: FnOnce() + Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let worker_source = source.to_string();

    std::thread::Builder::new()
        .name("texture-loader".into())
        .spawn(move || {
            let result = load_image(&worker_source);
            if sender.send(result).is_err() {
                log::debug!("texture `{worker_source}` finished after its request was dropped");
                return;
            }
            on_complete();
        })
        .map_err(TextureLoadError::Spawn)?;

    log::info!("loading texture `{source}`");
    Ok(PendingTexture {
        source: source.to_string(),
        receiver,
    })
}

/// Resolves `source` to a local file and decodes it as RGBA8.
pub fn load_image(source: &str) -> LoadResult {
    let path = local_path(source)?;
    let display = path.display().to_string();

    let image = image::open(&path).map_err(|error| match error {
        image::ImageError::IoError(error) => TextureLoadError::Io {
            path: display.clone(),
            error,
        },
        error => TextureLoadError::Decode {
            path: display.clone(),
            error,
        },
    })?;

    Ok(image.to_rgba8())
}

fn local_path(source: &str) -> Result<PathBuf, TextureLoadError> {
    if let Some(rest) = source.strip_prefix("file://") {
        return Ok(PathBuf::from(rest));
    }
    let remote = ["http://", "https://", "ftp://", "data:"]
        .iter()
        .any(|scheme| source.starts_with(scheme));
    if remote || source.is_empty() {
        return Err(TextureLoadError::UnsupportedSource(source.to_string()));
    }
    Ok(PathBuf::from(source))
}

/// Outcome of polling a pending load.
#[derive(Debug)]
pub enum TextureEvent {
    Uploaded,
    Failed(TextureLoadError),
}

/// The model texture: absent until a load completes and is uploaded.
pub struct TextureResource<G: GraphicsApi> {
    handle: Option<G::Texture>,
    pending: Option<PendingTexture>,
}

impl<G: GraphicsApi> Default for TextureResource<G> {
    fn default() -> Self {
        Self {
            handle: None,
            pending: None,
        }
    }
}

impl<G: GraphicsApi> TextureResource<G> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploaded texture, if any.
    pub fn handle(&self) -> Option<&G::Texture> {
        self.handle.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Tracks `pending`, replacing (and thereby discarding) any earlier request.
    pub fn begin_load(&mut self, pending: PendingTexture) {
        if let Some(previous) = self.pending.replace(pending) {
            log::debug!("texture request `{}` superseded", previous.source);
        }
    }

    /// Uploads a finished load, if one is ready. Never blocks.
    pub fn poll(&mut self, gl: &mut G) -> Option<TextureEvent> {
        let pending = self.pending.as_mut()?;
        let result = match pending.receiver.try_recv() {
            Ok(None) => return None,
            Ok(Some(result)) => result,
            Err(oneshot::Canceled) => Err(TextureLoadError::Abandoned(pending.source.clone())),
        };
        let source = self.pending.take().map(|p| p.source).unwrap_or_default();

        match result.and_then(|image| self.upload(gl, &image).map(|_| image.dimensions())) {
            Ok((width, height)) => {
                log::info!("texture `{source}` uploaded ({width}x{height})");
                Some(TextureEvent::Uploaded)
            }
            Err(err) => {
                log::error!("texture `{source}` unavailable, rendering untextured: {err}");
                Some(TextureEvent::Failed(err))
            }
        }
    }

    /// Uploads `image` as a trilinear-filtered, mipmapped 2D texture. Rows are
    /// flipped so texture coordinates use a bottom-left origin.
    ///
    /// Images wider or taller than the device limit are rejected before any
    /// GL call is made.
    pub fn upload(&mut self, gl: &mut G, image: &RgbaImage) -> Result<&G::Texture, TextureLoadError> {
        let max = gl.max_texture_dimension();
        let (width, height) = image.dimensions();
        if width.max(height) > max {
            return Err(TextureLoadError::TooLarge { width, height, max });
        }

        let flipped = image::imageops::flip_vertical(image);
        let texture = match self.handle.take() {
            Some(existing) => existing,
            None => gl.create_texture("model texture"),
        };

        gl.bind_texture(Some(&texture));
        gl.tex_image_2d(&flipped);
        gl.tex_filter(TextureFilter::Linear, TextureFilter::Linear);
        gl.generate_mipmap();
        gl.tex_filter(TextureFilter::Linear, TextureFilter::LinearMipmapLinear);
        gl.bind_texture(None);

        Ok(self.handle.insert(texture))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::recording::{GlCall, RecordingGl};
    use image::Rgba;

    fn two_row_image() -> RgbaImage {
        let mut img = RgbaImage::new(2, 2);
        for x in 0..2 {
            img.put_pixel(x, 0, Rgba([255, 0, 0, 255]));
            img.put_pixel(x, 1, Rgba([0, 0, 255, 255]));
        }
        img
    }

    // ── upload policy ──

    #[test]
    fn upload_flips_generates_mips_and_sets_trilinear() {
        let mut gl = RecordingGl::new();
        let mut tex = TextureResource::<RecordingGl>::new();
        tex.upload(&mut gl, &two_row_image()).unwrap();

        let calls = gl.calls();
        assert!(matches!(calls[0], GlCall::CreateTexture(_)));
        assert!(matches!(calls[1], GlCall::BindTexture(Some(_))));
        assert_eq!(
            calls[2],
            GlCall::TexImage2d {
                width: 2,
                height: 2,
                first_pixel: [0, 0, 255, 255]
            }
        );
        assert!(calls.contains(&GlCall::GenerateMipmap));
        let last_filter = calls.iter().rev().find_map(|c| match c {
            GlCall::TexFilter { mag, min } => Some((*mag, *min)),
            _ => None,
        });
        assert_eq!(last_filter, Some((TextureFilter::Linear, TextureFilter::LinearMipmapLinear)));
        assert!(tex.handle().is_some());
    }

    #[test]
    fn reupload_reuses_the_texture_object() {
        let mut gl = RecordingGl::new();
        let mut tex = TextureResource::<RecordingGl>::new();
        let first = *tex.upload(&mut gl, &two_row_image()).unwrap();
        let second = *tex.upload(&mut gl, &two_row_image()).unwrap();
        assert_eq!(first, second);
        assert_eq!(gl.count(|c| matches!(c, GlCall::CreateTexture(_))), 1);
    }

    // ── size limit ──

    #[test]
    fn oversized_image_is_rejected_before_any_gl_call() {
        let mut gl = RecordingGl::new().with_max_texture_dimension(4);
        let mut tex = TextureResource::<RecordingGl>::new();
        let wide = RgbaImage::new(8, 2);

        let err = tex.upload(&mut gl, &wide).unwrap_err();
        assert!(matches!(
            err,
            TextureLoadError::TooLarge {
                width: 8,
                height: 2,
                max: 4
            }
        ));
        assert!(gl.calls().is_empty());
        assert!(tex.handle().is_none());
    }

    #[test]
    fn image_at_the_limit_uploads() {
        let mut gl = RecordingGl::new().with_max_texture_dimension(2);
        let mut tex = TextureResource::<RecordingGl>::new();
        assert!(tex.upload(&mut gl, &two_row_image()).is_ok());
        assert!(tex.handle().is_some());
    }

    #[test]
    fn poll_reports_oversized_image_as_failed() {
        let mut gl = RecordingGl::new().with_max_texture_dimension(4);
        let mut tex = TextureResource::<RecordingGl>::new();
        let (sender, receiver) = oneshot::channel();
        tex.begin_load(PendingTexture::from_receiver("huge.png", receiver));
        sender.send(Ok(RgbaImage::new(8, 2))).unwrap();

        assert!(matches!(
            tex.poll(&mut gl),
            Some(TextureEvent::Failed(TextureLoadError::TooLarge { .. }))
        ));
        assert!(tex.handle().is_none());
        assert!(!tex.is_loading());
        assert!(gl.calls().is_empty());
    }

    // ── polling ──

    #[test]
    fn poll_before_completion_does_nothing() {
        let mut gl = RecordingGl::new();
        let mut tex = TextureResource::<RecordingGl>::new();
        let (_sender, receiver) = oneshot::channel();
        tex.begin_load(PendingTexture::from_receiver("a.png", receiver));

        assert!(tex.poll(&mut gl).is_none());
        assert!(tex.is_loading());
        assert!(gl.calls().is_empty());
    }

    #[test]
    fn poll_uploads_completed_image() {
        let mut gl = RecordingGl::new();
        let mut tex = TextureResource::<RecordingGl>::new();
        let (sender, receiver) = oneshot::channel();
        tex.begin_load(PendingTexture::from_receiver("a.png", receiver));
        sender.send(Ok(two_row_image())).unwrap();

        assert!(matches!(tex.poll(&mut gl), Some(TextureEvent::Uploaded)));
        assert!(tex.handle().is_some());
        assert!(!tex.is_loading());
        assert!(tex.poll(&mut gl).is_none());
    }

    #[test]
    fn failed_load_leaves_no_texture() {
        let mut gl = RecordingGl::new();
        let mut tex = TextureResource::<RecordingGl>::new();
        let (sender, receiver) = oneshot::channel();
        tex.begin_load(PendingTexture::from_receiver("gone.png", receiver));
        sender
            .send(Err(TextureLoadError::UnsupportedSource("gone.png".into())))
            .unwrap();

        assert!(matches!(tex.poll(&mut gl), Some(TextureEvent::Failed(_))));
        assert!(tex.handle().is_none());
        assert!(gl.calls().is_empty());
    }

    #[test]
    fn dropped_sender_reports_abandoned() {
        let mut gl = RecordingGl::new();
        let mut tex = TextureResource::<RecordingGl>::new();
        let (sender, receiver) = oneshot::channel::<LoadResult>();
        tex.begin_load(PendingTexture::from_receiver("x.png", receiver));
        drop(sender);

        assert!(matches!(
            tex.poll(&mut gl),
            Some(TextureEvent::Failed(TextureLoadError::Abandoned(_)))
        ));
    }

    #[test]
    fn superseded_request_is_ignored() {
        let mut gl = RecordingGl::new();
        let mut tex = TextureResource::<RecordingGl>::new();
        let (old_sender, old_receiver) = oneshot::channel();
        let (_new_sender, new_receiver) = oneshot::channel();
        tex.begin_load(PendingTexture::from_receiver("old.png", old_receiver));
        tex.begin_load(PendingTexture::from_receiver("new.png", new_receiver));

        assert!(old_sender.send(Ok(two_row_image())).is_err());
        assert!(tex.poll(&mut gl).is_none());
        assert!(tex.handle().is_none());
    }

    // ── sources ──

    #[test]
    fn remote_sources_are_unsupported() {
        for source in ["http://example.com/a.png", "https://example.com/a.png", ""] {
            assert!(matches!(load_image(source), Err(TextureLoadError::UnsupportedSource(_))));
        }
    }

    #[test]
    fn file_urls_resolve_to_paths() {
        assert_eq!(local_path("file:///tmp/a.png").unwrap(), PathBuf::from("/tmp/a.png"));
        assert_eq!(local_path("assets/a.png").unwrap(), PathBuf::from("assets/a.png"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load_image("/definitely/not/here/texture.png");
        assert!(matches!(result, Err(TextureLoadError::Io { .. })));
    }

    #[test]
    fn worker_decodes_and_wakes() {
        let dir = std::env::temp_dir().join(format!("vertexshadow-tex-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tiny.png");
        two_row_image().save(&path).unwrap();

        let (woke_tx, woke_rx) = std::sync::mpsc::channel();
        let pending = request_load(path.to_str().unwrap(), move || {
            woke_tx.send(()).unwrap();
        })
        .unwrap();
        woke_rx.recv_timeout(std::time::Duration::from_secs(10)).unwrap();

        let mut gl = RecordingGl::new();
        let mut tex = TextureResource::<RecordingGl>::new();
        tex.begin_load(pending);
        assert!(matches!(tex.poll(&mut gl), Some(TextureEvent::Uploaded)));

        std::fs::remove_dir_all(&dir).ok();
    }
}
