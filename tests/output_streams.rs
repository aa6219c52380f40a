// Output router behavior: capture exclusivity, the 16-frame bound, commit
// truncation, and the command-file stream.

use std::sync::Arc;
use zmio::zscii::DEFAULT_TABLES;
use zmio::{HeadlessIo, OutputRouter, StoryMemory, StreamError, MAX_CAPTURE_DEPTH};

const ROM_START: usize = 1024;

fn setup() -> (Arc<HeadlessIo>, OutputRouter, StoryMemory) {
    let io = Arc::new(HeadlessIo::new());
    let router = OutputRouter::new(io.clone(), Arc::clone(&DEFAULT_TABLES));
    let mem = StoryMemory::new(vec![0u8; 2048], ROM_START);
    (io, router, mem)
}

#[test]
fn print_reaches_screen_by_default() {
    let (io, mut router, _mem) = setup();
    router.print("West of House");
    router.print_char('\n');
    assert_eq!(io.screen(), "West of House\n");
    assert_eq!(io.transcript(), "");
}

#[test]
fn stream_1_disable_silences_screen_but_not_transcript() {
    let (io, mut router, mut mem) = setup();
    router.set_output_stream(&mut mem, 2, true, None).unwrap();
    router.set_output_stream(&mut mem, 1, false, None).unwrap();
    router.print("scored");
    assert_eq!(io.screen(), "");
    assert_eq!(io.transcript(), "scored");
}

#[test]
fn transcript_mirrors_screen_output() {
    let (io, mut router, mut mem) = setup();
    router.set_output_stream(&mut mem, 2, true, None).unwrap();
    router.print("You win.");
    assert_eq!(io.screen(), "You win.");
    assert_eq!(io.transcript(), "You win.");
}

#[test]
fn capture_is_exclusive() {
    let (io, mut router, mut mem) = setup();
    router.set_output_stream(&mut mem, 2, true, None).unwrap();
    router.set_output_stream(&mut mem, 3, true, Some(100)).unwrap();

    router.print("hidden");
    assert_eq!(io.screen(), "", "capture must bypass the screen");
    assert_eq!(io.transcript(), "", "capture must bypass the transcript");

    router.set_output_stream(&mut mem, 3, false, None).unwrap();
    assert_eq!(mem.read_word(100).unwrap(), 6);
    assert_eq!(&mem.bytes()[102..108], b"hidden");

    // routing resumes once the frame is committed
    router.print("shown");
    assert_eq!(io.screen(), "shown");
}

#[test]
fn nested_capture_goes_to_top_frame_only() {
    let (_io, mut router, mut mem) = setup();
    router.set_output_stream(&mut mem, 3, true, Some(100)).unwrap();
    router.print("outer ");
    router.set_output_stream(&mut mem, 3, true, Some(200)).unwrap();
    router.print("inner");
    router.set_output_stream(&mut mem, 3, false, None).unwrap();
    router.print("outer again");
    router.set_output_stream(&mut mem, 3, false, None).unwrap();

    assert_eq!(mem.read_word(200).unwrap(), 5);
    assert_eq!(&mem.bytes()[202..207], b"inner");
    assert_eq!(mem.read_word(100).unwrap(), 17);
    assert_eq!(&mem.bytes()[102..119], b"outer outer again");
}

#[test]
fn capture_nests_to_sixteen_frames_and_no_further() {
    let (_io, mut router, mut mem) = setup();
    for i in 0..MAX_CAPTURE_DEPTH {
        let addr = 100 + 40 * i as u16;
        router
            .set_output_stream(&mut mem, 3, true, Some(addr))
            .unwrap_or_else(|e| panic!("frame {} refused: {}", i + 1, e));
    }

    let err = router
        .set_output_stream(&mut mem, 3, true, Some(900))
        .unwrap_err();
    assert_eq!(err, StreamError::NestingTooDeep);

    // the prior frames are untouched: output still lands in frame 16 and
    // every frame still commits to its own table
    router.print("x");
    for i in (0..MAX_CAPTURE_DEPTH).rev() {
        router.set_output_stream(&mut mem, 3, false, None).unwrap();
        let addr = 100 + 40 * i as u16;
        let expect = if i == MAX_CAPTURE_DEPTH - 1 { 1 } else { 0 };
        assert_eq!(mem.read_word(addr as u32).unwrap(), expect);
    }
    assert!(!router.capture_active());
}

#[test]
fn commit_truncates_at_rom_boundary() {
    let (_io, mut router, mut mem) = setup();
    // 4 bytes of room below ROM: 1018 + 2 byte length word, then 1020..1024
    router
        .set_output_stream(&mut mem, 3, true, Some(1018))
        .unwrap();
    router.print("overflowing");
    router.set_output_stream(&mut mem, 3, false, None).unwrap();

    assert_eq!(mem.read_word(1018).unwrap(), 4);
    assert_eq!(&mem.bytes()[1020..1024], b"over");
    // nothing past the boundary
    assert_eq!(mem.bytes()[ROM_START], 0);
}

#[test]
fn capture_address_must_be_writable() {
    let (_io, mut router, mut mem) = setup();
    assert_eq!(
        router.set_output_stream(&mut mem, 3, true, Some(10)),
        Err(StreamError::InvalidAddress(10))
    );
    assert_eq!(
        router.set_output_stream(&mut mem, 3, true, Some(1023)),
        Err(StreamError::InvalidAddress(1023))
    );
    assert_eq!(
        router.set_output_stream(&mut mem, 3, true, None),
        Err(StreamError::InvalidAddress(0))
    );
}

#[test]
fn disabling_capture_without_a_frame_fails() {
    let (_io, mut router, mut mem) = setup();
    assert_eq!(
        router.set_output_stream(&mut mem, 3, false, None),
        Err(StreamError::NotCapturing)
    );
}

#[test]
fn unknown_stream_number_is_rejected() {
    let (_io, mut router, mut mem) = setup();
    assert_eq!(
        router.set_output_stream(&mut mem, 7, true, None),
        Err(StreamError::UnknownStream(7))
    );
    assert_eq!(
        router.set_output_stream(&mut mem, 0, false, None),
        Err(StreamError::UnknownStream(0))
    );
}

#[test]
fn command_file_records_input_lines() {
    let (io, mut router, mut mem) = setup();
    let file = io.provide_command_file();

    router.set_output_stream(&mut mem, 4, true, None).unwrap();
    assert!(router.command_log_active());

    router.record_command("go north", 13);
    router.record_command("look", 132); // terminated by a function key
    router.set_output_stream(&mut mem, 4, false, None).unwrap();

    assert_eq!(file.contents_utf8(), "go north\nlook[132]\n");
    assert!(!router.command_log_active());

    // recording with the stream off is a no-op
    router.record_command("wait", 13);
    assert_eq!(file.contents_utf8(), "go north\nlook[132]\n");
}

#[test]
fn declined_command_file_is_not_fatal() {
    let (_io, mut router, mut mem) = setup();
    // no file provided: the backend returns None
    router.set_output_stream(&mut mem, 4, true, None).unwrap();
    assert!(!router.command_log_active());
    router.record_command("go north", 13);
}

#[test]
fn zscii_print_routes_like_text() {
    let (io, mut router, mut mem) = setup();
    router.print_zscii(90); // 'Z'
    router.print_zscii(0); // legal no-op
    router.print_zscii(13); // newline
    assert_eq!(io.screen(), "Z\n");

    router.set_output_stream(&mut mem, 3, true, Some(100)).unwrap();
    router.print_zscii(90);
    router.print_zscii(155); // translation-table code stays a raw byte
    router.set_output_stream(&mut mem, 3, false, None).unwrap();
    assert_eq!(mem.read_word(100).unwrap(), 2);
    assert_eq!(mem.bytes()[102], 90);
    assert_eq!(mem.bytes()[103], 155);
}
