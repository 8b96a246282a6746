//! Integration tests for end-to-end embed and extract across media families.

mod common;

use common::{contains, document, engine, png_with_metadata, rgb_image, wav, wav_spec, y4m};
use hound::WavReader;
use image::ImageFormat;
use layered_stego::{ContentType, MediaKind, Payload};
use std::fs;
use std::io::Cursor;
use tempfile::TempDir;

fn assert_roundtrip(carrier: &[u8], expected_kind: MediaKind) {
    let engine = engine();
    let capacity = engine.capacity(carrier).expect("Failed to read capacity");
    assert_eq!(capacity.media_kind, expected_kind);

    let payload = Payload::file("notes.txt", b"meet at the usual place".to_vec()).expect("Invalid payload");
    let stego = engine.embed(carrier, &payload, "correct horse").expect("Failed to embed");
    let extracted = engine.extract(&stego, "correct horse").expect("Failed to extract");

    assert_eq!(extracted, payload);
    assert_eq!(engine.capacity(&stego).expect("Failed to reopen").media_kind, expected_kind);
}

#[test]
fn test_roundtrip_png() {
    assert_roundtrip(&rgb_image(64, 64, ImageFormat::Png), MediaKind::Image);
}

#[test]
fn test_roundtrip_bmp() {
    assert_roundtrip(&rgb_image(64, 64, ImageFormat::Bmp), MediaKind::Image);
}

#[test]
fn test_roundtrip_wav() {
    assert_roundtrip(&wav(20_000), MediaKind::Audio);
}

#[test]
fn test_roundtrip_y4m() {
    assert_roundtrip(&y4m(32, 32, 8), MediaKind::Video);
}

#[test]
fn test_roundtrip_document() {
    assert_roundtrip(&document(400), MediaKind::Document);
}

#[test]
fn test_scenario_layered_image() {
    let engine = engine();
    let carrier = rgb_image(200, 200, ImageFormat::Png);

    // First layer: a short text message
    let stego = engine
        .embed(&carrier, &Payload::text("hello"), "a")
        .expect("Failed to embed text");

    // Second layer: a 2 KB document under another password
    let doc: Vec<u8> = (0..2048).map(|i| (i * 31 % 256) as u8).collect();
    let file = Payload::file("doc.docx", doc.clone()).expect("Invalid payload");
    let stego = engine.embed(&stego, &file, "b").expect("Failed to embed file");

    let text = engine.extract(&stego, "a").expect("Failed to extract text");
    assert_eq!(text.as_text(), Some("hello"));
    assert_eq!(text.content_type, ContentType::Text);
    assert_eq!(text.filename, None);

    let extracted = engine.extract(&stego, "b").expect("Failed to extract file");
    assert_eq!(extracted.content, doc);
    assert_eq!(extracted.content_type, ContentType::File);
    assert!(extracted.resolved_filename().ends_with(".docx"));
}

#[test]
fn test_non_interference() {
    let engine = engine();
    let carrier = document(400);

    let first = Payload::text("first secret");
    let second = Payload::binary(vec![0xAA; 20]);
    let third = Payload::file("c.bin", vec![1, 2, 3]).expect("Invalid payload");

    let one = engine.embed(&carrier, &first, "k1").expect("Failed to embed");
    let two = engine.embed(&one, &second, "k2").expect("Failed to embed");
    let three = engine.embed(&two, &third, "k3").expect("Failed to embed");

    assert_eq!(engine.extract(&three, "k1").expect("k1"), first);
    assert_eq!(engine.extract(&three, "k2").expect("k2"), second);
    assert_eq!(engine.extract(&three, "k3").expect("k3"), third);
    assert_eq!(engine.extract(&two, "k1").expect("k1 in two"), first);
}

#[test]
fn test_same_password_returns_first_layer() {
    let engine = engine();
    let one = engine
        .embed(&document(400), &Payload::text("older"), "same")
        .expect("Failed to embed");
    let two = engine
        .embed(&one, &Payload::text("newer"), "same")
        .expect("Failed to embed");

    let payload = engine.extract(&two, "same").expect("Failed to extract");
    assert_eq!(payload.as_text(), Some("older"));
}

#[test]
fn test_list_layers_metadata_and_idempotence() {
    let engine = engine();
    let carrier = rgb_image(64, 64, ImageFormat::Png);
    assert!(engine.list_layers(&carrier).expect("Failed to list").is_empty());

    let stego = engine
        .embed(&carrier, &Payload::text("hello"), "a")
        .expect("Failed to embed");
    let stego = engine
        .embed(&stego, &Payload::file("/tmp/report.pdf", vec![0; 64]).expect("Invalid payload"), "b")
        .expect("Failed to embed");

    let first = engine.list_layers(&stego).expect("Failed to list");
    let second = engine.list_layers(&stego).expect("Failed to list");
    assert_eq!(first, second);

    assert_eq!(first.len(), 2);
    assert_eq!(first[0].index, 0);
    assert_eq!(first[0].offset_bits, 0);
    assert_eq!(first[0].content_type, ContentType::Text);
    assert_eq!(first[0].payload_len, 5);
    assert_eq!(first[1].offset_bits, first[0].end_bits());
    assert_eq!(first[1].filename.as_deref(), Some("report.pdf"));
    assert_eq!(first[1].payload_len, 64);
    assert_ne!(first[0].fingerprint(), first[1].fingerprint());
}

#[test]
fn test_image_stays_decodable_after_sequential_embeds() {
    let engine = engine();
    let mut carrier = rgb_image(64, 64, ImageFormat::Png);

    for round in 1..=3 {
        let message = format!("round {}", round);
        carrier = engine
            .embed(&carrier, &Payload::text(message), format!("pw{}", round))
            .expect("Failed to embed");

        assert_eq!(image::guess_format(&carrier).expect("Unknown format"), ImageFormat::Png);
        let decoded = image::load_from_memory(&carrier).expect("Artifact is not a valid PNG");
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
        assert_eq!(engine.list_layers(&carrier).expect("Failed to list").len(), round);
    }

    for round in 1..=3 {
        let payload = engine.extract(&carrier, format!("pw{}", round)).expect("Failed to extract");
        assert_eq!(payload.as_text(), Some(format!("round {}", round).as_str()));
    }
}

#[test]
fn test_png_metadata_survives_embed() {
    let engine = engine();
    let carrier = png_with_metadata(64, 64);
    assert!(contains(&carrier, b"tEXtCopyright"));
    assert!(contains(&carrier, b"iCCPdisplay"));

    let one = engine
        .embed(&carrier, &Payload::text("first"), "a")
        .expect("Failed to embed");
    let two = engine
        .embed(&one, &Payload::text("second"), "b")
        .expect("Failed to embed");

    for stego in [&one, &two] {
        assert!(contains(stego, b"tEXtCopyright\0Example Studio 2024"));
        assert!(contains(stego, b"iCCPdisplay\0\0icc-profile-bytes"));
        image::load_from_memory(stego).expect("Artifact is not a valid PNG");
    }

    assert_eq!(engine.extract(&two, "a").expect("Failed to extract").as_text(), Some("first"));
    assert_eq!(engine.extract(&two, "b").expect("Failed to extract").as_text(), Some("second"));
}

#[test]
fn test_audio_stays_decodable_after_sequential_embeds() {
    let engine = engine();
    let original = wav(20_000);
    let mut carrier = original.clone();

    for round in 1..=3 {
        carrier = engine
            .embed(&carrier, &Payload::text(format!("audio {}", round)), "pw")
            .expect("Failed to embed");

        let reader = WavReader::new(Cursor::new(&carrier)).expect("Artifact is not a valid WAV");
        assert_eq!(reader.spec(), wav_spec());
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<_, _>>()
            .expect("Failed to decode samples");
        assert_eq!(samples.len(), 20_000);
    }

    // The RIFF header is carried through byte for byte.
    assert_eq!(&carrier[..44], &original[..44]);
}

#[test]
fn test_video_stays_decodable_after_sequential_embeds() {
    let engine = engine();
    let original = y4m(32, 32, 8);
    let header_len = original.iter().position(|&b| b == b'\n').expect("No header") + 1;
    let frame_len = 32 * 32 + 2 * 16 * 16;
    let mut carrier = original.clone();

    for round in 1..=3 {
        carrier = engine
            .embed(&carrier, &Payload::text(format!("video {}", round)), format!("v{}", round))
            .expect("Failed to embed");

        assert_eq!(carrier.len(), original.len());
        assert_eq!(&carrier[..header_len], &original[..header_len]);
        for frame in 0..8 {
            let at = header_len + frame * (6 + frame_len);
            assert_eq!(&carrier[at..at + 6], b"FRAME\n", "frame {} marker damaged", frame);
        }
    }

    let payload = engine.extract(&carrier, "v2").expect("Failed to extract");
    assert_eq!(payload.as_text(), Some("video 2"));
}

#[test]
fn test_document_text_unchanged() {
    let engine = engine();
    let carrier = document(400);
    let stego = engine
        .embed(&carrier, &Payload::text("whitespace"), "pw")
        .expect("Failed to embed");

    let original = String::from_utf8(carrier).expect("UTF-8");
    let modified = String::from_utf8(stego).expect("Artifact is not UTF-8");
    let visible: Vec<&str> = modified.lines().map(str::trim_end).collect();
    assert_eq!(visible, original.lines().collect::<Vec<_>>());
}

#[test]
fn test_file_api_roundtrip() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let source = temp_dir.path().join("cover.png");
    let output = temp_dir.path().join("out").join("stego.png");
    fs::create_dir_all(output.parent().expect("parent")).expect("Failed to create dir");

    let carrier = rgb_image(100, 100, ImageFormat::Png);
    fs::write(&source, &carrier).expect("Failed to write carrier");

    let engine = engine();
    let payload = Payload::file("secret.zip", b"PK\x03\x04 archive".to_vec()).expect("Invalid payload");
    let report = engine
        .embed_file(&source, &output, &payload, "pw")
        .expect("Failed to embed file");

    assert_eq!(report.layer.index, 0);
    assert_eq!(report.chain_end_bits, report.layer.end_bits());
    assert_eq!(report.capacity.total_bits, 30_000);
    assert_eq!(report.remaining_bits(), 27_000 - report.chain_end_bits);

    // Source is untouched
    assert_eq!(fs::read(&source).expect("Failed to read source"), carrier);

    let extracted = engine.extract_file(&output, "pw").expect("Failed to extract");
    assert_eq!(extracted, payload);

    let layers = engine.list_layers_file(&output).expect("Failed to list");
    assert_eq!(layers, vec![report.layer.clone()]);

    let from_file = engine.capacity_file(&source).expect("Failed to read capacity");
    assert_eq!(from_file, engine.capacity(&carrier).expect("capacity"));

    // No staging files are left behind
    let entries = fs::read_dir(output.parent().expect("parent")).expect("read_dir").count();
    assert_eq!(entries, 1);
}

#[test]
fn test_capacity_fractions_per_media() {
    let engine = engine();

    let image = engine.capacity(&rgb_image(20, 20, ImageFormat::Png)).expect("image");
    assert_eq!((image.total_bits, image.safe_bits), (1_200, 1_080));

    let audio = engine.capacity(&wav(1_000)).expect("audio");
    assert_eq!((audio.total_bits, audio.safe_bits), (1_000, 500));

    let video = engine.capacity(&y4m(16, 16, 2)).expect("video");
    assert_eq!((video.total_bits, video.safe_bits), (768, 384));

    let doc = engine.capacity(&document(100)).expect("document");
    assert_eq!((doc.total_bits, doc.safe_bits), (400, 360));
}

#[test]
fn test_convenience_functions() {
    // Default Argon2 parameters; one layer keeps this affordable.
    let carrier = document(200);
    let stego = layered_stego::embed(&carrier, &Payload::text("hi"), "pw").expect("Failed to embed");

    assert_eq!(layered_stego::list_layers(&stego).expect("Failed to list").len(), 1);
    let payload = layered_stego::extract(&stego, "pw").expect("Failed to extract");
    assert_eq!(payload.as_text(), Some("hi"));
    assert_eq!(layered_stego::capacity(&stego).expect("capacity").total_bits, 800);
}
