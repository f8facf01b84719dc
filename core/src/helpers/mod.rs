// Copyright (c) 2024 The Alephium Ledger App Developers

use core::str::from_utf8;

use emstr::EncodeStr;

use crate::tx::{U256, U256_MAX_DIGITS};

/// ALPH decimal places
pub const ALPH_DECIMALS: usize = 18;

/// Fractional digits shown for ALPH amounts
pub const ALPH_DISPLAY_DECIMALS: usize = 6;

/// Buffer length sufficient for any [fmt_alph] output
pub const ALPH_FMT_LEN: usize = U256_MAX_DIGITS + 1 + 5;

/// Smallest displayable amount, 10^(18 - 6)
const MIN_DISPLAY: u64 = 1_000_000_000_000;

// Format helper for ALPH amounts, truncating to [ALPH_DISPLAY_DECIMALS]
pub fn fmt_alph<'a>(value: &U256, buff: &'a mut [u8]) -> &'a str {
    let r = match value {
        v if v.is_zero() => emstr::write!(&mut buff[..], "0 ALPH"),
        v if *v < U256::from_u64(MIN_DISPLAY) => emstr::write!(&mut buff[..], "<0.000001 ALPH"),
        v => {
            let mut digits = [b'0'; U256_MAX_DIGITS + ALPH_DECIMALS];
            let n = match v.write_decimal(&mut digits[ALPH_DECIMALS..]) {
                Some(n) => n,
                None => return "ENCODE_ERR",
            };

            // Left pad to at least one integer digit
            let end = ALPH_DECIMALS + n;
            let start = end.saturating_sub(ALPH_DECIMALS + 1).min(ALPH_DECIMALS);
            let digits = &digits[start..end];

            let split = digits.len() - ALPH_DECIMALS;
            let (int, frac) = digits.split_at(split);

            let frac = &frac[..ALPH_DISPLAY_DECIMALS];
            let frac_len = frac.iter().rposition(|c| *c != b'0').map(|i| i + 1);

            let int = from_utf8(int).unwrap_or("?");
            match frac_len {
                Some(l) => {
                    let frac = from_utf8(&frac[..l]).unwrap_or("?");
                    emstr::write!(&mut buff[..], int, '.', frac, " ALPH")
                }
                None => emstr::write!(&mut buff[..], int, " ALPH"),
            }
        }
    };

    match r {
        Ok(n) => from_utf8(&buff[..n]).unwrap_or("INVALID_UTF8"),
        Err(_) => "ENCODE_ERR",
    }
}

/// Format helper for raw integer amounts
pub fn fmt_u256<'a>(value: &U256, buff: &'a mut [u8]) -> &'a str {
    match value.write_decimal(buff) {
        Some(n) => from_utf8(&buff[..n]).unwrap_or("INVALID_UTF8"),
        None => "ENCODE_ERR",
    }
}

/// Format helper for hex strings
pub fn fmt_hex<'a>(d: &[u8], buff: &'a mut [u8]) -> &'a str {
    let n = d.len() * 2;
    if buff.len() < n {
        return "ENCODE_ERR";
    }

    if hex::encode_to_slice(d, &mut buff[..n]).is_err() {
        return "ENCODE_ERR";
    }

    from_utf8(&buff[..n]).unwrap_or("INVALID_UTF8")
}

/// Format helper for lock times (milliseconds since the epoch) as UTC date / time
pub fn fmt_lock_time(ms: u64, buff: &mut [u8]) -> &str {
    let secs = ms / 1000;
    let (days, rem) = (secs / 86400, secs % 86400);
    let (y, m, d) = civil_from_days(days as i64);

    let (m, d) = (pad2(m), pad2(d));
    let (h, min, s) = (
        pad2((rem / 3600) as u32),
        pad2((rem % 3600 / 60) as u32),
        pad2((rem % 60) as u32),
    );

    let r = emstr::write!(
        &mut buff[..],
        y as u32,
        '-',
        as_str(&m),
        '-',
        as_str(&d),
        ' ',
        as_str(&h),
        ':',
        as_str(&min),
        ':',
        as_str(&s),
        " UTC"
    );

    match r {
        Ok(n) => from_utf8(&buff[..n]).unwrap_or("INVALID_UTF8"),
        Err(_) => "ENCODE_ERR",
    }
}

/// Zero-padded two digit value
fn pad2(v: u32) -> [u8; 2] {
    [b'0' + (v / 10 % 10) as u8, b'0' + (v % 10) as u8]
}

fn as_str(d: &[u8]) -> &str {
    from_utf8(d).unwrap_or("??")
}

/// Days since 1970-01-01 to (year, month, day)
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719468;
    let era = z.div_euclid(146097);
    let doe = z.rem_euclid(146097);
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let y = yoe + era * 400 + (m <= 2) as i64;

    (y, m, d)
}

#[cfg(test)]
mod test {
    use super::*;

    const MAX_LINE_LEN: usize = 24;

    fn alph(whole: u64, nano: u64) -> U256 {
        let w = U256::from_u64(whole)
            .checked_mul(&U256::from_u64(1_000_000_000_000_000_000))
            .unwrap();
        w.checked_add(&U256::from_u64(nano)).unwrap()
    }

    #[test]
    fn fmt_alph_values() {
        let tests = &[
            (U256::ZERO, "0 ALPH"),
            (U256::from_u64(1), "<0.000001 ALPH"),
            (U256::from_u64(MIN_DISPLAY - 1), "<0.000001 ALPH"),
            (U256::from_u64(MIN_DISPLAY), "0.000001 ALPH"),
            (U256::from_u64(10_000_000_000_000), "0.00001 ALPH"),
            (U256::from_u64(100_000_000_000_000_000), "0.1 ALPH"),
            (alph(1, 0), "1 ALPH"),
            (alph(1, 10_101_000_000_000_000), "1.010101 ALPH"),
            (alph(1, 101_010_000_000_000_000), "1.10101 ALPH"),
            (alph(1, 999_999_900_000_000_000), "1.999999 ALPH"),
            (alph(111_111, 111_111_110_000_000_000), "111111.111111 ALPH"),
        ];

        for (v, s) in tests {
            let mut buff = [0u8; ALPH_FMT_LEN];

            let e = fmt_alph(v, &mut buff);

            assert_eq!(&e, s);
            assert!(e.len() <= MAX_LINE_LEN, "{e} exceeds line limit");
        }
    }

    #[test]
    fn fmt_alph_max() {
        let mut buff = [0u8; ALPH_FMT_LEN];
        let e = fmt_alph(&U256::MAX, &mut buff);
        assert_eq!(
            e,
            "115792089237316195423570985008687907853269984665640564039457.584007 ALPH"
        );
    }

    #[test]
    fn fmt_misc() {
        let mut buff = [0u8; 64];
        assert_eq!(fmt_hex(&[0xde, 0xad, 0x01], &mut buff), "dead01");
        assert_eq!(fmt_u256(&U256::from_u64(5000), &mut buff), "5000");
        assert_eq!(
            fmt_lock_time(1_700_000_000_000, &mut buff),
            "2023-11-14 22:13:20 UTC"
        );
        assert_eq!(fmt_lock_time(0, &mut buff), "1970-01-01 00:00:00 UTC");
    }
}
