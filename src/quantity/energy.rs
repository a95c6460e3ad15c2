quantity!(KilowattHours, "kWh");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(format!("{:.1}", KilowattHours(1.25)), "1.2 kWh");
    }

    #[test]
    fn test_sum() {
        let total: KilowattHours = [KilowattHours(0.5), KilowattHours(1.5)].into_iter().sum();
        assert_eq!(total, KilowattHours(2.0));
    }
}
