use std::marker::PhantomData;

use odbc_sys::{
    CDataType, Desc, HDesc, HStmt, Handle, HandleType, Pointer, SQLSetDescFieldW, IS_POINTER,
    IS_SMALLINT,
};

use super::{sql_result::ExtSqlReturn, AsHandle, SqlResult};

/// Kinds of application descriptors obtainable from a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    /// The application row descriptor (`SQL_ATTR_APP_ROW_DESC`), describing bound result
    /// columns.
    Row,
    /// The application parameter descriptor (`SQL_ATTR_APP_PARAM_DESC`), describing bound
    /// parameters.
    Param,
}

/// A descriptor associated with a statement. This wrapper does not wrap explicitly allocated
/// descriptors which have the connection as parent, but the implicitly allocated ones associated
/// with the statement. It is a view: dropping it does not free anything, and the statement must
/// outlive it.
pub struct Descriptor<'stmt> {
    handle: HDesc,
    parent: PhantomData<&'stmt HStmt>,
}

impl Descriptor<'_> {
    /// # Safety
    ///
    /// Call this method only with a valid (successfully allocated) ODBC descriptor handle.
    pub unsafe fn new(handle: HDesc) -> Self {
        Self {
            handle,
            parent: PhantomData,
        }
    }

    /// Directly access the underlying ODBC handle.
    pub fn as_sys(&self) -> HDesc {
        self.handle
    }

    /// Number of digits for an exact numeric type.
    pub fn set_precision(&mut self, rec_number: i16, precision: i16) -> SqlResult<()> {
        unsafe {
            SQLSetDescFieldW(
                self.as_sys(),
                rec_number,
                Desc::Precision,
                precision as Pointer,
                IS_SMALLINT,
            )
        }
        .into_sql_result("SQLSetDescFieldW")
    }

    /// The defined scale for decimal and numeric data types. The field is undefined for all other
    /// data types.
    pub fn set_scale(&mut self, rec_number: i16, scale: i16) -> SqlResult<()> {
        unsafe {
            SQLSetDescFieldW(
                self.as_sys(),
                rec_number,
                Desc::Scale,
                scale as Pointer,
                IS_SMALLINT,
            )
        }
        .into_sql_result("SQLSetDescFieldW")
    }

    /// C-Type bound to the data pointer.
    ///
    /// # Safety
    ///
    /// The buffer bound to the data pointer must match, otherwise calls to fetch might write
    /// beyond its bounds.
    pub unsafe fn set_type(&mut self, rec_number: i16, c_type: CDataType) -> SqlResult<()> {
        SQLSetDescFieldW(
            self.as_sys(),
            rec_number,
            Desc::Type,
            c_type as i16 as Pointer,
            IS_SMALLINT,
        )
        .into_sql_result("SQLSetDescFieldW")
    }

    /// Data pointer filled with values from the source when fetching data, or read when executing
    /// with bound parameters.
    ///
    /// # Safety
    ///
    /// Pointer must be valid and match the description set using `set_type`, `set_precision` and
    /// `set_scale`.
    pub unsafe fn set_data_ptr(&mut self, rec_number: i16, data_ptr: Pointer) -> SqlResult<()> {
        SQLSetDescFieldW(
            self.as_sys(),
            rec_number,
            Desc::DataPtr,
            data_ptr,
            IS_POINTER,
        )
        .into_sql_result("SQLSetDescFieldW")
    }

    /// Pointer to the length in bytes of the bound value.
    ///
    /// # Safety
    ///
    /// Pointer must remain valid for as long as the binding exists.
    pub unsafe fn set_octet_length_ptr(
        &mut self,
        rec_number: i16,
        length_ptr: *mut isize,
    ) -> SqlResult<()> {
        SQLSetDescFieldW(
            self.as_sys(),
            rec_number,
            Desc::OctetLengthPtr,
            length_ptr as Pointer,
            IS_POINTER,
        )
        .into_sql_result("SQLSetDescFieldW")
    }

    /// Pointer to the indicator of the bound value.
    ///
    /// # Safety
    ///
    /// Pointer must remain valid for as long as the binding exists.
    pub unsafe fn set_indicator_ptr(
        &mut self,
        rec_number: i16,
        indicator_ptr: *mut isize,
    ) -> SqlResult<()> {
        SQLSetDescFieldW(
            self.as_sys(),
            rec_number,
            Desc::IndicatorPtr,
            indicator_ptr as Pointer,
            IS_POINTER,
        )
        .into_sql_result("SQLSetDescFieldW")
    }
}

unsafe impl AsHandle for Descriptor<'_> {
    fn as_handle(&self) -> Handle {
        Handle(self.handle.0)
    }

    fn handle_type(&self) -> HandleType {
        HandleType::Desc
    }
}
