use crate::Error;

/// Parts per million
pub const PPM: i128 = 1_000_000;
/// Price scale: a price of `ONE` means one stable base unit per collateral base unit
pub const ONE: i128 = 1_000_000_000_000_000_000;
pub const SECONDS_PER_YEAR: u64 = 31_536_000; // 365 days

/// `a * b / c`, rounded down
pub fn mul_div(a: i128, b: i128, c: i128) -> Result<i128, Error> {
    a.checked_mul(b)
        .and_then(|x| x.checked_div(c))
        .ok_or(Error::ArithmeticError)
}

/// `a * b / c`, rounded up
pub fn mul_div_ceil(a: i128, b: i128, c: i128) -> Result<i128, Error> {
    let Some(product) = a.checked_mul(b) else {
        return Err(Error::ArithmeticError);
    };
    let Some(quotient) = product.checked_div(c) else {
        return Err(Error::ArithmeticError);
    };
    if product % c == 0 {
        Ok(quotient)
    } else {
        Ok(quotient + 1)
    }
}

pub fn checked_add(a: i128, b: i128) -> Result<i128, Error> {
    a.checked_add(b).ok_or(Error::ArithmeticError)
}

/// Value in stable units of `amount` collateral at `price`
pub fn value_of(amount: i128, price: i128) -> Result<i128, Error> {
    mul_div(amount, price, ONE)
}

/// Interest on `principal` at `rate_ppm` per year over `elapsed` seconds
pub fn interest_for(principal: i128, rate_ppm: u32, elapsed: u64) -> Result<i128, Error> {
    let Some(numerator) = principal
        .checked_mul(i128::from(rate_ppm))
        .and_then(|x| x.checked_mul(i128::from(elapsed)))
    else {
        return Err(Error::ArithmeticError);
    };
    Ok(numerator / (PPM * i128::from(SECONDS_PER_YEAR)))
}

/// Challenge auction price. Flat at `liq_price` for the first period, then decaying
/// linearly to zero over the second period.
pub fn auction_price(
    now: u64,
    start: u64,
    period: u64,
    liq_price: i128,
) -> Result<i128, Error> {
    let elapsed = now.saturating_sub(start);
    if elapsed <= period {
        Ok(liq_price)
    } else if elapsed < period.saturating_mul(2) {
        let time_left = period * 2 - elapsed;
        mul_div(liq_price, i128::from(time_left), i128::from(period))
    } else {
        Ok(0)
    }
}

/// Forced sale price of an expired position, `elapsed` seconds after expiration.
///
/// For the first period the price stays at the liquidation price. Over the second
/// period it rises linearly to `factor` times the liquidation price, then decays
/// linearly to zero over `tail_periods` further periods.
pub fn expired_purchase_price(
    elapsed: u64,
    period: u64,
    liq_price: i128,
    factor: u32,
    tail_periods: u32,
) -> Result<i128, Error> {
    let period = period.max(1);
    let ceiling = mul_div(liq_price, i128::from(factor.max(1)), 1)?;
    if elapsed <= period {
        return Ok(liq_price);
    }
    let rising = elapsed - period;
    if rising <= period {
        let premium = mul_div(ceiling - liq_price, i128::from(rising), i128::from(period))?;
        return checked_add(liq_price, premium);
    }
    let tail = period.saturating_mul(u64::from(tail_periods));
    let decaying = rising - period;
    if decaying >= tail {
        return Ok(0);
    }
    mul_div(ceiling, i128::from(tail - decaying), i128::from(tail))
}

#[cfg(test)]
mod test {
    use super::*;

    const DAY: u64 = 86_400;

    #[test]
    fn auction_is_flat_then_decays() {
        let price = 5_000 * ONE;
        assert_eq!(auction_price(100, 100, DAY, price), Ok(price));
        assert_eq!(auction_price(100 + DAY, 100, DAY, price), Ok(price));
        assert_eq!(auction_price(100 + DAY + DAY / 2, 100, DAY, price), Ok(price / 2));
        assert_eq!(auction_price(100 + 2 * DAY, 100, DAY, price), Ok(0));
        assert_eq!(auction_price(100 + 5 * DAY, 100, DAY, price), Ok(0));
    }

    #[test]
    fn forced_sale_rises_then_decays() {
        let price = 1_000 * ONE;
        assert_eq!(expired_purchase_price(0, DAY, price, 10, 4), Ok(price));
        assert_eq!(expired_purchase_price(DAY, DAY, price, 10, 4), Ok(price));
        assert_eq!(
            expired_purchase_price(DAY + DAY / 2, DAY, price, 10, 4),
            Ok(price * 11 / 2)
        );
        assert_eq!(expired_purchase_price(2 * DAY, DAY, price, 10, 4), Ok(price * 10));
        assert_eq!(expired_purchase_price(4 * DAY, DAY, price, 10, 4), Ok(price * 5));
        assert_eq!(expired_purchase_price(6 * DAY, DAY, price, 10, 4), Ok(0));
    }

    #[test]
    fn interest_for_a_year() {
        assert_eq!(interest_for(10_000, 50_000, SECONDS_PER_YEAR), Ok(500));
        assert_eq!(interest_for(10_000, 50_000, 0), Ok(0));
    }

    #[test]
    fn ceil_division() {
        assert_eq!(mul_div_ceil(10, 1, 3), Ok(4));
        assert_eq!(mul_div_ceil(9, 1, 3), Ok(3));
        assert_eq!(mul_div(1, 1, 0), Err(Error::ArithmeticError));
    }
}
