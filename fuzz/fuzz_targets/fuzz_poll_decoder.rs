//! Fuzz target: `PollDecoder::decode`
//!
//! The first input byte picks how the rest is split into raw buffers; the
//! decoder must never panic, must only ever emit whole records, and must
//! agree with a single-call decode of the same bytes.
//!
//! cargo fuzz run fuzz_poll_decoder

#![no_main]

use imubus::decode::DecodeState;
use imubus::sensors::lsm6ds3::{DEVICE_TYPE, RECORD_SIZE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&chunk, stream)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(chunk).max(1);
    let decoder = DEVICE_TYPE.decoder;

    let mut split_state = DecodeState::<32>::new();
    let mut split = Vec::new();
    for part in stream.chunks(chunk) {
        decoder.decode(part, &mut split_state, &mut split);
        assert!(split_state.carry_len() < RECORD_SIZE);
    }

    let mut whole_state = DecodeState::<32>::new();
    let mut whole = Vec::new();
    decoder.decode(stream, &mut whole_state, &mut whole);

    assert_eq!(split.len(), stream.len() / RECORD_SIZE);
    assert_eq!(split, whole);
    assert_eq!(split_state.carry_len(), whole_state.carry_len());
});
