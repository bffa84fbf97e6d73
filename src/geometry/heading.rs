/// Interior angle, in whole degrees, between arriving along `inbound`
/// and leaving along `outbound` (both clockwise from north).
///
/// Continuing straight on gives 180, a full reversal gives 0.
pub fn turn_degree(inbound: f64, outbound: f64) -> usize {
    let deflection = (outbound - inbound).rem_euclid(360.0);
    let deflection = if deflection > 180.0 {
        360.0 - deflection
    } else {
        deflection
    };

    (180.0 - deflection).round().clamp(0.0, 180.0) as usize
}
