//! Property tests for the Art-Net codec

use lightwire_artnet::protocol::{parse_header, ArtDmx, OpCode, PortAddress, SequenceCounter};
use lightwire_core::{DmxFrame, UNIVERSE_SIZE};
use proptest::prelude::*;

proptest! {
    #[test]
    fn address_round_trips(network in 0u8..=127, subnet in 0u8..=15, universe in 0u8..=15) {
        let address = PortAddress::new(network, subnet, universe);
        prop_assert_eq!(PortAddress::decode(address.encode()), address);
    }

    #[test]
    fn address_encoding_fits_fifteen_bits(network: u8, subnet: u8, universe: u8) {
        let encoded = PortAddress::new(network, subnet, universe).encode();
        prop_assert!(encoded <= 0x7FFF);
    }

    #[test]
    fn dmx_packet_round_trips(
        sequence: u8,
        physical: u8,
        raw_address in 0u16..=0x7FFF,
        data in prop::collection::vec(any::<u8>(), 0..=UNIVERSE_SIZE),
    ) {
        let packet = ArtDmx {
            sequence,
            physical,
            address: PortAddress::decode(raw_address),
            frame: DmxFrame::new(data).unwrap(),
        };

        let bytes = packet.encode();
        let (header, body) = parse_header(&bytes).unwrap();
        prop_assert_eq!(header.op(), Some(OpCode::Dmx));
        prop_assert_eq!(ArtDmx::decode(body).unwrap(), packet);
    }

    #[test]
    fn sequence_never_returns_zero(steps in 1usize..2000) {
        let mut counter = SequenceCounter::new();
        for _ in 0..steps {
            prop_assert_ne!(counter.next_value(), 0);
        }
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        if let Ok((_, body)) = parse_header(&bytes) {
            let _ = ArtDmx::decode(body);
        }
    }
}
