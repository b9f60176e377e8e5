// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Contains the implementation of `Array`, the payload of an array `Variant`.

use crate::types::{
    encoding::dimensions_product,
    status_codes::StatusCode,
    variant::Variant,
    variant_type_id::{EncodingMask, VariantTypeId},
};

/// An array is a vector of values with an optional number of dimensions.
///
/// A null array (no values) is distinct from an empty array (zero values) and each encodes
/// differently. When dimensions are present their product equals the number of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    // Type of elements in the array
    pub value_type: VariantTypeId,

    /// Values are stored sequentially. `None` is the null array.
    pub values: Option<Vec<Variant>>,

    /// Multi dimension array which can contain any scalar type, all the same type. Nested
    /// arrays are rejected. Higher rank dimensions are serialized first. For example an array
    /// with dimensions [2,2,2] is written in this order - [0,0,0], [0,0,1], [0,1,0], [0,1,1],
    /// [1,0,0], [1,0,1], [1,1,0], [1,1,1].
    pub dimensions: Option<Vec<u32>>,
}

impl Array {
    /// Creates a single dimension array. Every value must be of the value type.
    pub fn new<V>(value_type: VariantTypeId, values: V) -> Result<Array, StatusCode>
    where
        V: Into<Vec<Variant>>,
    {
        let values = values.into();
        Self::validate_array_type_to_values(value_type, &values)?;
        Ok(Array {
            value_type,
            values: Some(values),
            dimensions: None,
        })
    }

    /// Creates the null array of a type, i.e. the array that is not there as opposed to one with
    /// zero elements.
    pub fn null(value_type: VariantTypeId) -> Array {
        Array {
            value_type,
            values: None,
            dimensions: None,
        }
    }

    /// Creates a multi dimension array. The product of the dimensions must equal the number of
    /// values and no dimension may be zero.
    pub fn new_multi<V, D>(
        value_type: VariantTypeId,
        values: V,
        dimensions: D,
    ) -> Result<Array, StatusCode>
    where
        V: Into<Vec<Variant>>,
        D: Into<Vec<u32>>,
    {
        let values = values.into();
        let dimensions = dimensions.into();
        Self::validate_array_type_to_values(value_type, &values)?;
        if !Self::dimensions_match(&dimensions, values.len()) {
            error!(
                "Array dimensions {:?} do not match the number of values {}",
                dimensions,
                values.len()
            );
            return Err(StatusCode::BadInvalidArgument);
        }
        Ok(Array {
            value_type,
            values: Some(values),
            dimensions: Some(dimensions),
        })
    }

    /// This is a runtime check to ensure the type of the array also matches the types of the variants in the array.
    fn validate_array_type_to_values(
        value_type: VariantTypeId,
        values: &[Variant],
    ) -> Result<(), StatusCode> {
        if value_type == VariantTypeId::Empty {
            error!("Invalid array type supplied");
            Err(StatusCode::BadInvalidArgument)
        } else if !values_are_of_type(values, value_type) {
            Err(StatusCode::BadInvalidArgument)
        } else {
            Ok(())
        }
    }

    /// Tests that dimensions are non-empty, have no zero entry and multiply out to the length.
    pub fn dimensions_match(dimensions: &[u32], len: usize) -> bool {
        !dimensions.is_empty()
            && dimensions.iter().all(|d| *d > 0)
            && dimensions_product(dimensions) == Some(len)
    }

    pub fn is_null(&self) -> bool {
        self.values.is_none()
    }

    pub fn len(&self) -> usize {
        self.values.as_ref().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The values, or an empty slice for the null array
    pub fn values(&self) -> &[Variant] {
        self.values.as_deref().unwrap_or(&[])
    }

    pub fn is_valid(&self) -> bool {
        let types_valid = values_are_of_type(self.values(), self.value_type);
        match self.dimensions {
            Some(ref dimensions) => {
                types_valid && !self.is_null() && Self::dimensions_match(dimensions, self.len())
            }
            None => types_valid,
        }
    }

    pub fn has_dimensions(&self) -> bool {
        self.dimensions.is_some()
    }

    pub fn encoding_mask(&self) -> u8 {
        let mut encoding_mask = self.value_type.encoding_mask();
        encoding_mask |= EncodingMask::ARRAY_VALUES_BIT;
        if self.has_dimensions() {
            encoding_mask |= EncodingMask::ARRAY_DIMENSIONS_BIT;
        }
        encoding_mask
    }
}

/// Check that all elements in the slice of arrays are the same type. Nested arrays never are.
pub fn values_are_of_type(values: &[Variant], expected_type: VariantTypeId) -> bool {
    let found_unexpected = values
        .iter()
        .any(|v| v.is_array() || v.type_id() != expected_type);
    if found_unexpected {
        error!(
            "Variant array's type is expected to be {:?} but found other types in it",
            expected_type
        );
    };
    !found_unexpected
}

#[test]
fn array_null_and_empty() {
    let null = Array::null(VariantTypeId::Int32);
    assert!(null.is_null());
    assert!(null.is_empty());
    let empty = Array::new(VariantTypeId::Int32, Vec::new()).unwrap();
    assert!(!empty.is_null());
    assert!(empty.is_empty());
    assert_ne!(null, empty);
}

#[test]
fn array_new_multi() {
    let values: Vec<Variant> = (0..6).map(Variant::Int32).collect();
    assert!(Array::new_multi(VariantTypeId::Int32, values.clone(), vec![2u32, 3]).is_ok());
    assert_eq!(
        Array::new_multi(VariantTypeId::Int32, values.clone(), vec![2u32, 2]).unwrap_err(),
        StatusCode::BadInvalidArgument
    );
    assert!(Array::new_multi(VariantTypeId::Int32, values.clone(), vec![0u32, 3]).is_err());
    assert!(Array::new_multi(VariantTypeId::Int32, values, Vec::<u32>::new()).is_err());
    assert!(Array::new(VariantTypeId::Double, vec![Variant::Int32(1)]).is_err());
}
