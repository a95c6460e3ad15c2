quantity!(Millimeters, "mm");
quantity!(Percentage, "%");
quantity!(KilometersPerHour, "km/h");
quantity!(Hectopascals, "hPa");
