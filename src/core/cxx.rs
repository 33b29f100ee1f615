//! C++ language standards and the fine-grained language features a package
//! archive may require.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// C++ standard level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CxxStandard {
    /// C++98
    #[serde(rename = "98", alias = "c++98")]
    Cxx98,
    /// C++11
    #[serde(rename = "11", alias = "c++11")]
    Cxx11,
    /// C++14
    #[serde(rename = "14", alias = "c++14")]
    Cxx14,
    /// C++17
    #[serde(rename = "17", alias = "c++17")]
    Cxx17,
}

impl CxxStandard {
    /// Numeric level as compared by the build-script helpers.
    ///
    /// C++98 is level 0 so that it never raises an already configured
    /// `CMAKE_CXX_STANDARD`.
    pub fn level(&self) -> i64 {
        match self {
            CxxStandard::Cxx98 => 0,
            CxxStandard::Cxx11 => 11,
            CxxStandard::Cxx14 => 14,
            CxxStandard::Cxx17 => 17,
        }
    }
}

impl fmt::Display for CxxStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CxxStandard::Cxx98 => "98",
            CxxStandard::Cxx11 => "11",
            CxxStandard::Cxx14 => "14",
            CxxStandard::Cxx17 => "17",
        };
        write!(f, "C++{}", name)
    }
}

/// Error returned when parsing an unknown language feature name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown C++ language feature '{0}'")]
pub struct CxxFeatureParseError(pub String);

macro_rules! cxx_language_features {
    ($($variant:ident => $name:literal, $standard:ident;)*) => {
        /// A CMake compile feature (`target_compile_features`) a package may require.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum CxxLanguageFeature {
            $(
                #[serde(rename = $name)]
                $variant,
            )*
        }

        impl CxxLanguageFeature {
            /// Every known feature, in declaration order.
            pub const ALL: &'static [CxxLanguageFeature] = &[$(CxxLanguageFeature::$variant),*];

            /// The CMake feature name, e.g. `cxx_auto_type`.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(CxxLanguageFeature::$variant => $name,)*
                }
            }

            /// The lowest standard that provides this feature.
            pub fn standard(&self) -> CxxStandard {
                match self {
                    $(CxxLanguageFeature::$variant => CxxStandard::$standard,)*
                }
            }
        }
    };
}

cxx_language_features! {
    CxxStd98 => "cxx_std_98", Cxx98;
    CxxStd11 => "cxx_std_11", Cxx11;
    CxxStd14 => "cxx_std_14", Cxx14;
    CxxStd17 => "cxx_std_17", Cxx17;
    AggregateDefaultInitializers => "cxx_aggregate_default_initializers", Cxx11;
    AliasTemplates => "cxx_alias_templates", Cxx11;
    Alignas => "cxx_alignas", Cxx11;
    Alignof => "cxx_alignof", Cxx11;
    Attributes => "cxx_attributes", Cxx11;
    AttributeDeprecated => "cxx_attribute_deprecated", Cxx14;
    AutoType => "cxx_auto_type", Cxx11;
    BinaryLiterals => "cxx_binary_literals", Cxx14;
    Constexpr => "cxx_constexpr", Cxx11;
    ContextualConversions => "cxx_contextual_conversions", Cxx14;
    DecltypeIncompleteReturnTypes => "cxx_decltype_incomplete_return_types", Cxx11;
    Decltype => "cxx_decltype", Cxx11;
    DecltypeAuto => "cxx_decltype_auto", Cxx14;
    DefaultFunctionTemplateArgs => "cxx_default_function_template_args", Cxx11;
    DefaultedFunctions => "cxx_defaulted_functions", Cxx11;
    DefaultedMoveInitializers => "cxx_defaulted_move_initializers", Cxx11;
    DelegatingConstructors => "cxx_delegating_constructors", Cxx11;
    DeletedFunctions => "cxx_deleted_functions", Cxx11;
    DigitSeparators => "cxx_digit_separators", Cxx14;
    EnumForwardDeclarations => "cxx_enum_forward_declarations", Cxx11;
    ExplicitConversions => "cxx_explicit_conversions", Cxx11;
    ExtendedFriendDeclarations => "cxx_extended_friend_declarations", Cxx11;
    ExternTemplates => "cxx_extern_templates", Cxx11;
    Final => "cxx_final", Cxx11;
    FuncIdentifier => "cxx_func_identifier", Cxx11;
    GeneralizedInitializers => "cxx_generalized_initializers", Cxx11;
    GenericLambdas => "cxx_generic_lambdas", Cxx14;
    InheritingConstructors => "cxx_inheriting_constructors", Cxx11;
    InlineNamespaces => "cxx_inline_namespaces", Cxx11;
    Lambdas => "cxx_lambdas", Cxx11;
    LambdaInitCaptures => "cxx_lambda_init_captures", Cxx14;
    LocalTypeTemplateArgs => "cxx_local_type_template_args", Cxx11;
    LongLongType => "cxx_long_long_type", Cxx11;
    Noexcept => "cxx_noexcept", Cxx11;
    NonstaticMemberInit => "cxx_nonstatic_member_init", Cxx11;
    Nullptr => "cxx_nullptr", Cxx11;
    Override => "cxx_override", Cxx11;
    RangeFor => "cxx_range_for", Cxx11;
    RawStringLiterals => "cxx_raw_string_literals", Cxx11;
    ReferenceQualifiedFunctions => "cxx_reference_qualified_functions", Cxx11;
    RelaxedConstexpr => "cxx_relaxed_constexpr", Cxx14;
    ReturnTypeDeduction => "cxx_return_type_deduction", Cxx11;
    RightAngleBrackets => "cxx_right_angle_brackets", Cxx11;
    RvalueReferences => "cxx_rvalue_references", Cxx11;
    SizeofMember => "cxx_sizeof_member", Cxx11;
    StaticAssert => "cxx_static_assert", Cxx11;
    StrongEnums => "cxx_strong_enums", Cxx11;
    ThreadLocal => "cxx_thread_local", Cxx11;
    TrailingReturnTypes => "cxx_trailing_return_types", Cxx11;
    UnicodeLiterals => "cxx_unicode_literals", Cxx11;
    UniformInitialization => "cxx_uniform_initialization", Cxx11;
    UnrestrictedUnions => "cxx_unrestricted_unions", Cxx11;
    UserLiterals => "cxx_user_literals", Cxx11;
    VariableTemplates => "cxx_variable_templates", Cxx14;
    VariadicMacros => "cxx_variadic_macros", Cxx11;
    VariadicTemplates => "cxx_variadic_templates", Cxx11;
    TemplateTemplateParameters => "cxx_template_template_parameters", Cxx11;
}

impl fmt::Display for CxxLanguageFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CxxLanguageFeature {
    type Err = CxxFeatureParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CxxLanguageFeature::ALL
            .iter()
            .find(|feature| feature.as_str() == s)
            .copied()
            .ok_or_else(|| CxxFeatureParseError(s.to_string()))
    }
}

/// The minimum standard satisfying every feature in `features`.
///
/// Returns C++98 for an empty set.
pub fn minimum_standard(features: &[CxxLanguageFeature]) -> CxxStandard {
    features
        .iter()
        .map(CxxLanguageFeature::standard)
        .max()
        .unwrap_or(CxxStandard::Cxx98)
}
