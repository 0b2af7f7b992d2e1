//! End-to-end tests for `VideoProcessor` on the host emulation backend.
//!
//! Frames live in ordinary `Vec<u8>` buffers; the host backend treats their
//! addresses as device pointers, so every path (stream creation, dispatch,
//! deferred failures, dumps) runs exactly as it would on a GPU.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel;
use tracing_subscriber::EnvFilter;

use vpp_common::color::{chroma_extent, PixelFormat};
use vpp_common::error::{GpuError, VppError};
use vpp_common::frame::{Frame, Plane};
use vpp_common::gpu_traits::{DeviceCapabilities, GpuStream, VppBackend};
use vpp_common::kernel::{KernelArgs, KernelId};
use vpp_common::types::{ConversionTarget, ResizeMethod};
use vpp_common::VppConfig;
use vpp_gpu_hal::host::kernels::{nearest_index, yuv_to_rgb};
use vpp_gpu_hal::HostBackend;
use vpp_processor::{ProcessorState, VideoProcessor};

// ---------------------------------------------------------------------------
// Host-memory frames
// ---------------------------------------------------------------------------

/// NV12 image in host memory with optional row padding.
struct Nv12Image {
    width: u32,
    height: u32,
    y_pitch: usize,
    uv_pitch: usize,
    y: Vec<u8>,
    uv: Vec<u8>,
}

impl Nv12Image {
    fn new(width: u32, height: u32, padding: usize) -> Self {
        let y_pitch = width as usize + padding;
        let uv_pitch = chroma_extent(width) as usize * 2 + padding;
        Self {
            width,
            height,
            y_pitch,
            uv_pitch,
            y: vec![0; y_pitch * height as usize],
            uv: vec![0; uv_pitch * chroma_extent(height) as usize],
        }
    }

    /// Deterministic non-trivial content.
    fn pattern(width: u32, height: u32) -> Self {
        let mut image = Self::new(width, height, 0);
        image.fill(|x, y| ((x * 7 + y * 3) % 220 + 16) as u8, |cx, cy| {
            (((cx * 5 + cy * 11) % 200 + 28) as u8, ((cx * 13 + cy * 2) % 180 + 40) as u8)
        });
        image
    }

    fn uniform(width: u32, height: u32, y: u8, u: u8, v: u8) -> Self {
        let mut image = Self::new(width, height, 0);
        image.fill(|_, _| y, |_, _| (u, v));
        image
    }

    fn fill(&mut self, luma: impl Fn(u32, u32) -> u8, chroma: impl Fn(u32, u32) -> (u8, u8)) {
        for y in 0..self.height {
            for x in 0..self.width {
                self.y[y as usize * self.y_pitch + x as usize] = luma(x, y);
            }
        }
        for cy in 0..chroma_extent(self.height) {
            for cx in 0..chroma_extent(self.width) {
                let (u, v) = chroma(cx, cy);
                let at = cy as usize * self.uv_pitch + cx as usize * 2;
                self.uv[at] = u;
                self.uv[at + 1] = v;
            }
        }
    }

    fn luma(&self, x: u32, y: u32) -> u8 {
        self.y[y as usize * self.y_pitch + x as usize]
    }

    fn chroma(&self, cx: u32, cy: u32) -> (u8, u8) {
        let at = cy as usize * self.uv_pitch + cx as usize * 2;
        (self.uv[at], self.uv[at + 1])
    }

    fn frame(&mut self) -> Frame {
        // SAFETY: the buffers outlive every frame built from them in these
        // tests, and each test synchronizes before the image is dropped.
        unsafe {
            Frame::from_raw_parts(
                PixelFormat::Nv12,
                self.width,
                self.height,
                vec![
                    Plane::new(self.y.as_mut_ptr() as u64, self.y_pitch, self.y.len()),
                    Plane::new(self.uv.as_mut_ptr() as u64, self.uv_pitch, self.uv.len()),
                ],
            )
        }
    }
}

/// Single-plane packed image (RGB24, BGR24, Y800).
struct PackedImage {
    format: PixelFormat,
    width: u32,
    height: u32,
    pitch: usize,
    data: Vec<u8>,
}

impl PackedImage {
    fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        let pitch = (width * format.bytes_per_pixel()) as usize;
        Self {
            format,
            width,
            height,
            pitch,
            data: vec![0; pitch * height as usize],
        }
    }

    fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let bpp = self.format.bytes_per_pixel() as usize;
        let at = y as usize * self.pitch + x as usize * bpp;
        &self.data[at..at + bpp]
    }

    fn frame(&mut self) -> Frame {
        // SAFETY: see `Nv12Image::frame`.
        unsafe {
            Frame::from_raw_parts(
                self.format,
                self.width,
                self.height,
                vec![Plane::new(
                    self.data.as_mut_ptr() as u64,
                    self.pitch,
                    self.data.len(),
                )],
            )
        }
    }
}

/// `RUST_LOG=vpp_processor=debug cargo test` shows dispatch logs.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn open_processor() -> (Arc<HostBackend>, VideoProcessor) {
    init_tracing();
    let backend = Arc::new(HostBackend::new());
    let vpp = VideoProcessor::new(backend.clone(), &VppConfig::default());
    vpp.initialize(false).unwrap();
    (backend, vpp)
}

// ---------------------------------------------------------------------------
// Conversion results
// ---------------------------------------------------------------------------

#[test]
fn full_hd_to_720p_rgb_for_trainer1() {
    let (backend, vpp) = open_processor();
    let mut src = Nv12Image::pattern(1920, 1080);
    let mut dst = PackedImage::new(PixelFormat::Rgb24, 1280, 720);
    let target = ConversionTarget::new(1280, 720, PixelFormat::Rgb24);

    vpp.convert(&src.frame(), &mut dst.frame(), &target, "trainer1")
        .unwrap();
    vpp.synchronize("trainer1").unwrap();

    assert_eq!(vpp.consumer_count(), 1);
    assert_eq!(backend.streams_created(), 1);
    assert_eq!(backend.launch_count(), 1);
    assert_eq!(dst.data.len(), 1280 * 720 * 3);

    // Nearest resize on each grid, then the colour transform.
    for y in 0..720 {
        for x in 0..1280 {
            let sy = nearest_index(y, 720, 1080);
            let sx = nearest_index(x, 1280, 1920);
            let scx = nearest_index(x / 2, 640, 960);
            let scy = nearest_index(y / 2, 360, 540);
            let (u, v) = src.chroma(scx, scy);
            let expected = yuv_to_rgb(src.luma(sx, sy), u, v);
            assert_eq!(dst.pixel(x, y), &expected[..], "pixel ({x}, {y})");
        }
    }
}

#[test]
fn bgr_is_rgb_with_channels_swapped() {
    let (_backend, vpp) = open_processor();
    let mut src = Nv12Image::pattern(64, 36);
    let mut rgb = PackedImage::new(PixelFormat::Rgb24, 64, 36);
    let mut bgr = PackedImage::new(PixelFormat::Bgr24, 64, 36);

    let rgb_target = ConversionTarget::new(64, 36, PixelFormat::Rgb24);
    let bgr_target = ConversionTarget::new(64, 36, PixelFormat::Bgr24);
    vpp.convert(&src.frame(), &mut rgb.frame(), &rgb_target, "cam")
        .unwrap();
    vpp.convert(&src.frame(), &mut bgr.frame(), &bgr_target, "cam")
        .unwrap();
    vpp.synchronize("cam").unwrap();

    for (a, b) in rgb.data.chunks(3).zip(bgr.data.chunks(3)) {
        assert_eq!([a[0], a[1], a[2]], [b[2], b[1], b[0]]);
    }
}

#[test]
fn y800_copies_luma() {
    let (_backend, vpp) = open_processor();
    let mut src = Nv12Image::pattern(50, 30);
    let mut dst = PackedImage::new(PixelFormat::Y800, 50, 30);
    let target = ConversionTarget::new(50, 30, PixelFormat::Y800);

    vpp.convert(&src.frame(), &mut dst.frame(), &target, "mono")
        .unwrap();
    vpp.synchronize("mono").unwrap();

    for y in 0..30 {
        for x in 0..50 {
            assert_eq!(dst.pixel(x, y)[0], src.luma(x, y));
        }
    }
}

#[test]
fn repeated_conversions_are_byte_identical() {
    let (_backend, vpp) = open_processor();
    let mut src = Nv12Image::pattern(320, 180);
    let target =
        ConversionTarget::new(200, 120, PixelFormat::Bgr24).with_resize(ResizeMethod::Bilinear);

    let mut outputs = Vec::new();
    for _ in 0..3 {
        let mut dst = PackedImage::new(PixelFormat::Bgr24, 200, 120);
        vpp.convert(&src.frame(), &mut dst.frame(), &target, "det")
            .unwrap();
        vpp.synchronize("det").unwrap();
        outputs.push(dst.data);
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[1], outputs[2]);
}

#[test]
fn nearest_resize_to_same_size_is_identity() {
    let (_backend, vpp) = open_processor();
    let mut src = Nv12Image::pattern(97, 55);
    // Padded destination: only visible bytes must match.
    let mut dst = Nv12Image::new(97, 55, 13);
    let target = ConversionTarget::new(97, 55, PixelFormat::Nv12);

    vpp.convert(&src.frame(), &mut dst.frame(), &target, "copy")
        .unwrap();
    vpp.synchronize("copy").unwrap();

    for y in 0..55 {
        for x in 0..97 {
            assert_eq!(dst.luma(x, y), src.luma(x, y));
        }
    }
    for cy in 0..chroma_extent(55) {
        for cx in 0..chroma_extent(97) {
            assert_eq!(dst.chroma(cx, cy), src.chroma(cx, cy));
        }
    }
}

#[test]
fn bilinear_resize_of_uniform_frame_is_uniform() {
    let (_backend, vpp) = open_processor();
    let mut src = Nv12Image::uniform(123, 77, 81, 90, 240);

    for (w, h) in [(40, 20), (123, 77), (300, 211), (1, 1)] {
        let mut dst = Nv12Image::new(w, h, 3);
        let target =
            ConversionTarget::new(w, h, PixelFormat::Nv12).with_resize(ResizeMethod::Bilinear);
        vpp.convert(&src.frame(), &mut dst.frame(), &target, "flat")
            .unwrap();
        vpp.synchronize("flat").unwrap();

        for y in 0..h {
            for x in 0..w {
                assert_eq!(dst.luma(x, y), 81, "{w}x{h} luma ({x}, {y})");
            }
        }
        for cy in 0..chroma_extent(h) {
            for cx in 0..chroma_extent(w) {
                assert_eq!(dst.chroma(cx, cy), (90, 240), "{w}x{h} chroma ({cx}, {cy})");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn dimension_mismatch_does_no_device_work() {
    let (backend, vpp) = open_processor();
    let mut src = Nv12Image::pattern(64, 64);
    let mut dst = PackedImage::new(PixelFormat::Rgb24, 32, 32);
    let target = ConversionTarget::new(48, 48, PixelFormat::Rgb24);

    let err = vpp
        .convert(&src.frame(), &mut dst.frame(), &target, "bad")
        .unwrap_err();
    assert!(matches!(err, VppError::DimensionMismatch { .. }));
    assert_eq!(backend.streams_created(), 0);
    assert_eq!(backend.launch_count(), 0);
    assert!(vpp.consumer_stream("bad").is_none());
    assert!(dst.data.iter().all(|&b| b == 0));
}

#[test]
fn non_nv12_source_is_unsupported() {
    let (backend, vpp) = open_processor();
    let mut src = PackedImage::new(PixelFormat::Rgb24, 8, 8);
    let mut dst = PackedImage::new(PixelFormat::Y800, 8, 8);
    let target = ConversionTarget::new(8, 8, PixelFormat::Y800);

    let err = vpp
        .convert(&src.frame(), &mut dst.frame(), &target, "x")
        .unwrap_err();
    assert!(matches!(err, VppError::UnsupportedConversion { .. }));
    assert_eq!(backend.streams_created(), 0);
}

// ---------------------------------------------------------------------------
// Streams and lifecycle
// ---------------------------------------------------------------------------

#[test]
fn first_convert_creates_the_consumer_stream_once() {
    let (backend, vpp) = open_processor();
    let mut src = Nv12Image::pattern(16, 16);
    let mut dst = PackedImage::new(PixelFormat::Y800, 16, 16);
    let target = ConversionTarget::new(16, 16, PixelFormat::Y800);

    vpp.convert(&src.frame(), &mut dst.frame(), &target, "a")
        .unwrap();
    let first = vpp.consumer_stream("a").unwrap();
    vpp.convert(&src.frame(), &mut dst.frame(), &target, "a")
        .unwrap();
    vpp.synchronize("a").unwrap();

    assert!(Arc::ptr_eq(&first, &vpp.consumer_stream("a").unwrap()));
    assert_eq!(backend.streams_created(), 1);
    assert_eq!(backend.launch_count(), 2);
}

#[test]
fn blocked_consumer_does_not_delay_another() {
    let (backend, vpp) = open_processor();
    let mut src = Nv12Image::pattern(64, 32);
    let mut out_a = PackedImage::new(PixelFormat::Y800, 64, 32);
    let mut out_b = PackedImage::new(PixelFormat::Y800, 64, 32);
    let target = ConversionTarget::new(64, 32, PixelFormat::Y800);

    // Create "a"'s stream, then park its worker behind a gate.
    let mut warmup = PackedImage::new(PixelFormat::Y800, 64, 32);
    vpp.convert(&src.frame(), &mut warmup.frame(), &target, "a")
        .unwrap();
    vpp.synchronize("a").unwrap();
    let (gate_tx, gate_rx) = channel::bounded::<()>(0);
    vpp.consumer_stream("a")
        .unwrap()
        .with_stream(|stream| {
            backend.launch_host_fn(stream, move || {
                let _ = gate_rx.recv();
                Ok(())
            })
        })
        .unwrap();
    vpp.convert(&src.frame(), &mut out_a.frame(), &target, "a")
        .unwrap();

    // "b" completes while "a" is still blocked.
    vpp.convert(&src.frame(), &mut out_b.frame(), &target, "b")
        .unwrap();
    vpp.synchronize("b").unwrap();
    assert_eq!(out_b.pixel(5, 5)[0], src.luma(5, 5));

    std::thread::sleep(Duration::from_millis(20));
    assert!(out_a.data.iter().all(|&b| b == 0), "a ran before its gate opened");

    gate_tx.send(()).unwrap();
    vpp.synchronize("a").unwrap();
    assert_eq!(out_a.data, out_b.data);
}

#[test]
fn deferred_failure_is_reported_on_next_convert() {
    let (backend, vpp) = open_processor();
    let mut src = Nv12Image::pattern(16, 16);
    let mut dst = PackedImage::new(PixelFormat::Rgb24, 16, 16);
    let target = ConversionTarget::new(16, 16, PixelFormat::Rgb24);

    vpp.convert(&src.frame(), &mut dst.frame(), &target, "f")
        .unwrap();
    let (ran_tx, ran_rx) = channel::bounded::<()>(1);
    let handle = vpp.consumer_stream("f").unwrap();
    handle
        .with_stream(|stream| {
            backend.launch_host_fn(stream, || {
                Err(GpuError::KernelFailed {
                    kernel: "nv12_to_rgb24".into(),
                    reason: "illegal address".into(),
                })
            })?;
            backend.launch_host_fn(stream, move || {
                let _ = ran_tx.send(());
                Ok(())
            })
        })
        .unwrap();
    ran_rx.recv().unwrap();

    let err = vpp
        .convert(&src.frame(), &mut dst.frame(), &target, "f")
        .unwrap_err();
    assert!(matches!(err, VppError::KernelLaunchFailure { .. }), "{err:?}");

    // Reported once; the stream keeps working.
    vpp.convert(&src.frame(), &mut dst.frame(), &target, "f")
        .unwrap();
    vpp.synchronize("f").unwrap();
}

#[test]
fn launch_beyond_device_limit_fails() {
    // Launches are planned for 1024-thread blocks but the device takes 64.
    let backend = Arc::new(LyingBackend {
        inner: HostBackend::with_max_threads(64),
    });
    let vpp = VideoProcessor::new(backend, &VppConfig::default());
    vpp.initialize(false).unwrap();

    let mut src = Nv12Image::pattern(64, 64);
    let mut dst = PackedImage::new(PixelFormat::Y800, 64, 64);
    let target = ConversionTarget::new(64, 64, PixelFormat::Y800);
    let err = vpp
        .convert(&src.frame(), &mut dst.frame(), &target, "big")
        .unwrap_err();
    match err {
        VppError::KernelLaunchFailure { kernel, .. } => assert_eq!(kernel, "nv12_to_y800"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn operations_fail_after_shutdown() {
    let (backend, vpp) = open_processor();
    let mut src = Nv12Image::pattern(16, 16);
    let mut dst = PackedImage::new(PixelFormat::Y800, 16, 16);
    let target = ConversionTarget::new(16, 16, PixelFormat::Y800);
    vpp.convert(&src.frame(), &mut dst.frame(), &target, "a")
        .unwrap();
    vpp.convert(&src.frame(), &mut dst.frame(), &target, "b")
        .unwrap();
    let stale = vpp.consumer_stream("a").unwrap();

    vpp.shutdown();
    assert_eq!(vpp.state(), ProcessorState::Closed);
    assert_eq!(backend.live_stream_count(), 0);
    assert!(stale.is_released());

    let err = vpp
        .convert(&src.frame(), &mut dst.frame(), &target, "a")
        .unwrap_err();
    assert!(matches!(err, VppError::NotOpen));
    assert!(matches!(vpp.dump(&dst.frame(), "a"), Err(VppError::NotOpen)));
}

#[test]
fn reinitialize_after_shutdown_starts_fresh() {
    let (backend, vpp) = open_processor();
    let mut src = Nv12Image::pattern(16, 16);
    let mut dst = PackedImage::new(PixelFormat::Y800, 16, 16);
    let target = ConversionTarget::new(16, 16, PixelFormat::Y800);
    vpp.convert(&src.frame(), &mut dst.frame(), &target, "a")
        .unwrap();
    vpp.shutdown();

    vpp.initialize(false).unwrap();
    assert_eq!(vpp.state(), ProcessorState::Open);
    assert_eq!(vpp.consumer_count(), 0);
    vpp.convert(&src.frame(), &mut dst.frame(), &target, "a")
        .unwrap();
    vpp.synchronize("a").unwrap();
    assert_eq!(backend.streams_created(), 2);
}

#[test]
fn capability_query_failure_keeps_processor_closed() {
    let vpp = VideoProcessor::new(Arc::new(BrokenBackend), &VppConfig::default());
    let err = vpp.initialize(false).unwrap_err();
    assert!(matches!(err, VppError::DeviceQueryFailure(_)));
    assert_eq!(vpp.state(), ProcessorState::Uninitialized);
}

#[test]
fn concurrent_consumers_share_one_processor() {
    let (backend, vpp) = open_processor();
    let vpp = Arc::new(vpp);

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let vpp = Arc::clone(&vpp);
            std::thread::spawn(move || {
                let consumer = format!("worker-{i}");
                let mut src = Nv12Image::pattern(80, 40);
                let mut dst = PackedImage::new(PixelFormat::Rgb24, 40, 20);
                let target = ConversionTarget::new(40, 20, PixelFormat::Rgb24);
                for _ in 0..5 {
                    vpp.convert(&src.frame(), &mut dst.frame(), &target, &consumer)
                        .unwrap();
                }
                vpp.synchronize(&consumer).unwrap();
                dst.data
            })
        })
        .collect();

    let outputs: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(vpp.consumer_count(), 4);
    assert_eq!(backend.streams_created(), 4);
    assert_eq!(backend.launch_count(), 20);
}

// ---------------------------------------------------------------------------
// Dumps
// ---------------------------------------------------------------------------

#[test]
fn dumps_append_visible_bytes_per_consumer() {
    let dir = std::env::temp_dir().join("vpp_processor_dump_test");
    let _ = std::fs::remove_dir_all(&dir);
    let config = VppConfig::default().with_dump_dir(&dir);
    let vpp = VideoProcessor::new(Arc::new(HostBackend::new()), &config);
    vpp.initialize(true).unwrap();

    let mut src = Nv12Image::pattern(32, 18);
    let mut dst = PackedImage::new(PixelFormat::Rgb24, 16, 8);
    let target = ConversionTarget::new(16, 8, PixelFormat::Rgb24);
    vpp.convert(&src.frame(), &mut dst.frame(), &target, "trainer1")
        .unwrap();
    vpp.synchronize("trainer1").unwrap();
    vpp.dump(&dst.frame(), "trainer1").unwrap();
    vpp.dump(&dst.frame(), "trainer1").unwrap();
    assert_eq!(vpp.dump_sink_count(), 1);
    vpp.shutdown();

    let bytes = std::fs::read(dir.join("trainer1.dump")).unwrap();
    let mut expected = dst.data.clone();
    expected.extend_from_slice(&dst.data);
    assert_eq!(bytes, expected);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn nv12_dump_contains_both_planes_without_padding() {
    let dir = std::env::temp_dir().join("vpp_processor_nv12_dump_test");
    let _ = std::fs::remove_dir_all(&dir);
    let config = VppConfig::default().with_dump_dir(&dir);
    let vpp = VideoProcessor::new(Arc::new(HostBackend::new()), &config);
    vpp.initialize(true).unwrap();

    let mut frame = Nv12Image::pattern(6, 4);
    let mut padded = Nv12Image::new(6, 4, 10);
    let target = ConversionTarget::new(6, 4, PixelFormat::Nv12);
    vpp.convert(&frame.frame(), &mut padded.frame(), &target, "n")
        .unwrap();
    vpp.synchronize("n").unwrap();
    vpp.dump(&padded.frame(), "n").unwrap();
    vpp.shutdown();

    let bytes = std::fs::read(dir.join("n.dump")).unwrap();
    let mut expected = frame.y.clone();
    expected.extend_from_slice(&frame.uv);
    assert_eq!(bytes, expected);
    let _ = std::fs::remove_dir_all(&dir);
}

// ---------------------------------------------------------------------------
// Test backends
// ---------------------------------------------------------------------------

/// Fails the capability query.
struct BrokenBackend;

impl VppBackend for BrokenBackend {
    fn device_name(&self) -> &str {
        "broken"
    }

    fn capabilities(&self) -> Result<DeviceCapabilities, GpuError> {
        Err(GpuError::CapabilityQuery("device lost".into()))
    }

    fn create_stream(&self) -> Result<GpuStream, GpuError> {
        Err(GpuError::NoBackend)
    }

    fn synchronize(&self, _stream: &GpuStream) -> Result<(), GpuError> {
        Err(GpuError::NoBackend)
    }

    fn destroy_stream(&self, _stream: GpuStream) -> Result<(), GpuError> {
        Err(GpuError::NoBackend)
    }

    fn dispatch_kernel(
        &self,
        _kernel: &KernelId,
        _grid: [u32; 3],
        _block: [u32; 3],
        _args: &KernelArgs,
        _stream: &GpuStream,
    ) -> Result<(), GpuError> {
        Err(GpuError::NoBackend)
    }

    fn copy_to_host(&self, _src: u64, _dst: &mut [u8]) -> Result<(), GpuError> {
        Err(GpuError::NoBackend)
    }
}

/// Advertises 1024 threads per block but executes on a smaller device.
struct LyingBackend {
    inner: HostBackend,
}

impl VppBackend for LyingBackend {
    fn device_name(&self) -> &str {
        self.inner.device_name()
    }

    fn capabilities(&self) -> Result<DeviceCapabilities, GpuError> {
        let mut caps = self.inner.capabilities()?;
        caps.max_threads_per_block = 1024;
        Ok(caps)
    }

    fn create_stream(&self) -> Result<GpuStream, GpuError> {
        self.inner.create_stream()
    }

    fn synchronize(&self, stream: &GpuStream) -> Result<(), GpuError> {
        self.inner.synchronize(stream)
    }

    fn destroy_stream(&self, stream: GpuStream) -> Result<(), GpuError> {
        self.inner.destroy_stream(stream)
    }

    fn dispatch_kernel(
        &self,
        kernel: &KernelId,
        grid: [u32; 3],
        block: [u32; 3],
        args: &KernelArgs,
        stream: &GpuStream,
    ) -> Result<(), GpuError> {
        self.inner.dispatch_kernel(kernel, grid, block, args, stream)
    }

    fn copy_to_host(&self, src: u64, dst: &mut [u8]) -> Result<(), GpuError> {
        self.inner.copy_to_host(src, dst)
    }
}
