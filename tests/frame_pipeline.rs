//! Runs the whole pipeline on the host: draw, rotate, encode, scan out.
//!
//! The DMA chain is replaced with one that copies out whatever each
//! published address points at, which is what the hardware would stream.

use agat_vga::{
    DirectScan, DmaChain, FrameTiming, Geometry, LineAddr, Palette, PreparedLines, PreparedScan,
    Rgbi, ScanlineTemplates, ScanoutEngine, TripleBuffers, VideoMode, MODE_640X480_60HZ,
    MODE_AGAT7,
};

/// Copies out every line it is given.
struct Snapshots {
    line_bytes: usize,
    lines: Vec<Vec<u8>>,
}

impl Snapshots {
    fn new(mode: &VideoMode) -> Snapshots {
        Snapshots {
            line_bytes: mode.line_bytes(),
            lines: Vec::new(),
        }
    }

    fn copy(&mut self, addr: LineAddr) {
        // Every address we are given is a live ScanLine at least this long
        let bytes =
            unsafe { std::slice::from_raw_parts(addr.as_usize() as *const u8, self.line_bytes) };
        self.lines.push(bytes.to_vec());
    }
}

impl DmaChain for Snapshots {
    fn arm(&mut self, first: LineAddr) {
        self.copy(first);
    }

    fn reload_source(&mut self, next: LineAddr) {
        self.copy(next);
    }
}

#[test]
fn prepared_lines_show_the_committed_frame() {
    let mode = MODE_AGAT7;
    assert_eq!(mode.check(), Ok(()));
    let geometry = Geometry::derive(&mode);
    let palette = Palette::new(mode.sync_polarity);
    let mut templates = Box::new(ScanlineTemplates::new());
    templates.init(&geometry);
    let mut prepared = Box::new(PreparedLines::new());
    prepared.init(&geometry);

    let buffers = Box::new(TripleBuffers::new());
    buffers.set_buffering_mode(true);
    let (mut producer, mut consumer) = buffers.split().unwrap();

    // Let the scan-out free up some slots
    assert!(producer.acquire_for_write().is_none());
    consumer.acquire_for_display();
    consumer.acquire_for_display();

    let drawing = producer.acquire_for_write().unwrap();
    drawing.fill_span(0, 10, 128, Rgbi::RED).unwrap();
    drawing.store_pixel(255, 200, Rgbi::WHITE);
    // Commit it. Nothing else is free yet, so we get no new slot back.
    assert!(producer.acquire_for_write().is_none());

    // The display side gets to it within one lap of the slots
    let mut shown = consumer.acquire_for_display();
    let mut laps = 0;
    while buffers.index_of(shown) != buffers.index_of(drawing) {
        laps += 1;
        assert!(laps < 3, "committed frame never shown");
        shown = consumer.acquire_for_display();
    }
    assert_eq!(laps, 1);

    prepared.rebuild(&geometry, shown, &palette);

    let mut engine = ScanoutEngine::new(
        FrameTiming::new(&mode),
        templates.blank.addr(),
        templates.vsync.addr(),
        PreparedScan::new(geometry, &prepared),
        Snapshots::new(&mode),
    );
    engine.start();
    for _ in 0..(mode.whole_frame - 2) {
        engine.on_line_complete();
    }

    let lines = &engine.dma().lines;
    assert_eq!(lines.len(), usize::from(mode.whole_frame));
    let red = 0xC0 | Rgbi::RED.to_output();
    for (y, line) in lines.iter().enumerate() {
        let (idle, pulse) = if (272..280).contains(&y) {
            (0x40, 0x00)
        } else {
            (0xC0, 0x80)
        };
        assert!(line[272..304].iter().all(|b| *b == pulse), "line {}", y);
        assert!(line[304..].iter().all(|b| *b == idle), "line {}", y);
        match y {
            10 => assert!(line[..256].iter().all(|b| *b == red)),
            200 => {
                assert!(line[..255].iter().all(|b| *b == 0xC0));
                assert_eq!(line[255], 0xFF);
            }
            _ => assert!(line[..256].iter().all(|b| *b == idle), "line {}", y),
        }
    }
}

#[test]
fn direct_scan_never_tears() {
    let mode = MODE_640X480_60HZ;
    let geometry = Geometry::derive(&mode);
    let palette = Palette::new(mode.sync_polarity);
    let mut templates = Box::new(ScanlineTemplates::new());
    templates.init(&geometry);
    let blank = templates.blank.addr();
    let vsync = templates.vsync.addr();

    let buffers = Box::new(TripleBuffers::new());
    buffers.set_buffering_mode(true);
    let (mut producer, consumer) = buffers.split().unwrap();

    let scan = DirectScan::new(geometry, &palette, &mut templates.image, consumer);
    let mut engine = ScanoutEngine::new(
        FrameTiming::new(&mode),
        blank,
        vsync,
        scan,
        Snapshots::new(&mode),
    );
    engine.start();

    const FRAMES: usize = 10;
    for frame in 0..FRAMES {
        for step in 0..mode.whole_frame {
            // Draw part-way down the screen, as a real producer would
            if step == 240 {
                if let Some(fb) = producer.acquire_for_write() {
                    fb.fill(Rgbi::new(frame as u8 + 1));
                }
            }
            engine.on_line_complete();
        }
    }

    // Split the output into one run of visible lines per frame
    let lines = &engine.dma().lines;
    let per_frame: Vec<&[Vec<u8>]> = lines
        .chunks(usize::from(mode.whole_frame))
        .map(|chunk| &chunk[..480])
        .take(FRAMES)
        .collect();

    for (frame, visible) in per_frame.iter().enumerate() {
        let first = visible[0][32];
        for (y, line) in visible.iter().enumerate() {
            assert!(line[..32].iter().all(|b| *b == 0xC0));
            assert!(line[288..320].iter().all(|b| *b == 0xC0));
            assert!(
                line[32..288].iter().all(|b| *b == first),
                "frame {} line {} tore",
                frame,
                y
            );
        }
        let expected = if frame < 4 {
            0xC0
        } else {
            0xC0 | Rgbi::new(frame as u8 - 1).to_output()
        };
        assert_eq!(first, expected, "frame {}", frame);
    }
}
