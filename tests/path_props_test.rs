use mctsd::domain::SampleClass;
use mctsd::handler::{IngestError, parse_learn_path};
use proptest::prelude::*;

proptest! {
    #[test]
    fn accepts_every_known_class_and_plain_user(
        class in prop_oneof![Just("ham"), Just("spam")],
        user in "[a-zA-Z0-9@._+-]{1,32}",
    ) {
        let (parsed_class, parsed_user) = parse_learn_path(&format!("{class}/{user}")).unwrap();
        prop_assert_eq!(parsed_class.as_str(), class);
        prop_assert_eq!(parsed_user, user);
    }

    #[test]
    fn never_panics_on_arbitrary_input(rest in ".*") {
        let _ = parse_learn_path(&rest);
    }

    #[test]
    fn more_than_two_segments_is_invalid_path(
        a in "[a-z]{0,8}",
        b in "[a-z]{0,8}",
        c in "[a-z]{0,8}",
    ) {
        prop_assert_eq!(parse_learn_path(&format!("{a}/{b}/{c}")), Err(IngestError::InvalidPath));
    }

    #[test]
    fn unknown_class_is_rejected_whatever_the_user(
        class in "[a-z]{1,10}",
        user in "[a-z]{0,10}",
    ) {
        prop_assume!(class.parse::<SampleClass>().is_err());
        prop_assert_eq!(
            parse_learn_path(&format!("{class}/{user}")),
            Err(IngestError::UnknownClass)
        );
    }
}
