mod hash {
    use pretty_assertions::{assert_eq, assert_ne};
    use reach_param_repo::demo::{self, ParamId};
    use reach_param_repo::schema::{
        DefaultValue, StorageClass, access_filtered_hash, hash_of_persistent_parameters,
    };
    use reach_param_repo::{AllowAll, ServiceId};

    #[test]
    fn deterministic() {
        let hash = demo::SCHEMA.hash_of_persistent_parameters();
        assert_eq!(hash, demo::SCHEMA.hash_of_persistent_parameters());
        assert_eq!(hash, hash_of_persistent_parameters(&demo::PARAMETERS));
        assert_ne!(hash, 0);
    }

    #[test]
    fn any_persistent_field_changes_the_hash() {
        let original = hash_of_persistent_parameters(&demo::PARAMETERS);
        let offset = ParamId::TimezoneOffset as usize;
        let interval = ParamId::IdentifyInterval as usize;

        let mut renamed = demo::PARAMETERS;
        renamed[offset].name = "Timezone Offsed";
        assert_ne!(hash_of_persistent_parameters(&renamed), original);

        let mut described = demo::PARAMETERS;
        described[offset].description = Some("UTC offset");
        assert_ne!(hash_of_persistent_parameters(&described), original);

        let mut range = demo::PARAMETERS;
        range[interval].metadata.range_max = Some(61.0);
        assert_ne!(hash_of_persistent_parameters(&range), original);

        let mut default = demo::PARAMETERS;
        default[interval].metadata.default_value = Some(DefaultValue::Float32(2.0));
        assert_ne!(hash_of_persistent_parameters(&default), original);

        let mut unit = demo::PARAMETERS;
        unit[offset].metadata.unit = Some("minutes");
        assert_ne!(hash_of_persistent_parameters(&unit), original);

        let mut volatile = demo::PARAMETERS;
        volatile[offset].storage = StorageClass::Volatile;
        assert_ne!(hash_of_persistent_parameters(&volatile), original);
    }

    #[test]
    fn long_text_is_hashed_in_full() {
        let offset = ParamId::TimezoneOffset as usize;

        let mut forward = demo::PARAMETERS;
        forward[offset].name = "Motor Controller Acceleration Limit Forward";
        let mut reverse = demo::PARAMETERS;
        reverse[offset].name = "Motor Controller Acceleration Limit Reverse";
        assert_ne!(
            hash_of_persistent_parameters(&forward),
            hash_of_persistent_parameters(&reverse)
        );

        let mut seconds = demo::PARAMETERS;
        seconds[offset].description =
            Some("Offset of local time from UTC, applied when the timezone is on, in seconds");
        let mut minutes = demo::PARAMETERS;
        minutes[offset].description =
            Some("Offset of local time from UTC, applied when the timezone is on, in minutes");
        assert_ne!(
            hash_of_persistent_parameters(&seconds),
            hash_of_persistent_parameters(&minutes)
        );

        // trailing zero bytes would vanish in the padding without the length word
        let mut short = demo::PARAMETERS;
        short[offset].metadata.unit = Some("s");
        let mut padded = demo::PARAMETERS;
        padded[offset].metadata.unit = Some("s\0");
        assert_ne!(
            hash_of_persistent_parameters(&short),
            hash_of_persistent_parameters(&padded)
        );
    }

    #[test]
    fn volatile_parameters_are_ignored() {
        let original = hash_of_persistent_parameters(&demo::PARAMETERS);

        let mut changed = demo::PARAMETERS;
        changed[ParamId::Identify as usize].name = "Blink";
        changed[ParamId::Uptime as usize].metadata.unit = Some("seconds");
        assert_eq!(hash_of_persistent_parameters(&changed), original);
    }

    #[test]
    fn identical_descriptors_cancel_out() {
        // a known blind spot of the XOR hash
        let desc = demo::PARAMETERS[ParamId::TimezoneOffset as usize];
        assert_eq!(hash_of_persistent_parameters(&[desc, desc]), 0);
        assert_eq!(hash_of_persistent_parameters(&[]), 0);
    }

    #[test]
    fn access_filtered() {
        let all = demo::SCHEMA.access_filtered_hash(&AllowAll);
        assert_eq!(all, demo::SCHEMA.access_filtered_hash(&AllowAll));

        let hide_uptime = |service: ServiceId, id: u32| {
            service != ServiceId::ParameterRepo || id != ParamId::Uptime as u32
        };
        let filtered = demo::SCHEMA.access_filtered_hash(&hide_uptime);
        assert_ne!(filtered, all);

        // volatile descriptors count here, unlike for the persistence hash
        let mut changed = demo::PARAMETERS;
        changed[ParamId::Identify as usize].name = "Blink";
        assert_ne!(
            access_filtered_hash(&changed, &demo::EXTENDED_INFO, &AllowAll),
            all
        );

        let mut labels = demo::EXTENDED_INFO;
        labels[0].labels = &[];
        assert_ne!(
            access_filtered_hash(&demo::PARAMETERS, &labels, &AllowAll),
            all
        );
    }
}

mod lookup {
    use pretty_assertions::assert_eq;
    use reach_param_repo::Error;
    use reach_param_repo::demo::{self, ExtendedInfoId, ParamId};
    use reach_param_repo::schema::TypeTag;

    #[test]
    fn parameters() {
        let desc = demo::SCHEMA.parameter(ParamId::IdentifyInterval as u32).unwrap();
        assert_eq!(desc.name, "Identify Interval");
        assert_eq!(desc.type_tag, TypeTag::Float32);
        assert!(desc.is_persistent());

        assert_eq!(demo::SCHEMA.parameter(11).unwrap_err(), Error::InvalidId);
        assert_eq!(demo::SCHEMA.parameter(9999).unwrap_err(), Error::InvalidId);
    }

    #[test]
    fn labels() {
        assert_eq!(
            demo::SCHEMA.label(ExtendedInfoId::RgbLedColor as u32, 5),
            Some("Magenta")
        );
        assert_eq!(
            demo::SCHEMA.label(ExtendedInfoId::IdentifyLed as u32, 1),
            Some("Illuminated")
        );
        assert_eq!(demo::SCHEMA.label(ExtendedInfoId::RgbLedState as u32, 3), None);
        assert_eq!(demo::SCHEMA.label(7, 0), None);
        assert_eq!(demo::SCHEMA.extended_info(3).unwrap_err(), Error::InvalidId);
    }
}
