/// CRC-8 as the ESC firmware computes it: polynomial 0x07, initial value 0,
/// MSB-first, no final XOR. Any deviation desynchronizes the link silently,
/// so the bit sequence below is not negotiable.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;
    for &byte in data {
        let mut inbyte = byte;
        for _ in 0..8 {
            let mix = (crc ^ inbyte) & 0x80;
            crc <<= 1;
            if mix != 0 {
                crc ^= 0x07;
            }
            inbyte <<= 1;
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_zero() {
        assert_eq!(crc8(&[]), 0);
    }

    #[test]
    fn standard_check_value() {
        // CRC-8 (poly 0x07, init 0, no reflect, no xorout) over "123456789"
        assert_eq!(crc8(b"123456789"), 0xF4);
    }

    #[test]
    fn command_payload_vectors() {
        // pinned against the firmware: SetSpeed(0) and TelemetryRequest payloads
        assert_eq!(crc8(&[0x01, 0x00, 0x00]), 0x6B);
        assert_eq!(crc8(&[0x02, 0x00, 0x00]), 0xD6);
    }

    #[test]
    fn deterministic() {
        let data = [0x13, 0x37, 0xBE, 0xEF];
        assert_eq!(crc8(&data), crc8(&data));
    }
}
