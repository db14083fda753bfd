//! Backend API paths.

// User
pub const LOGIN: &str = "/api/user/login";
pub const REGISTER: &str = "/api/user/registration";
pub const LOGOUT: &str = "/api/user/logout";
pub const REFRESH_TOKEN: &str = "/api/user/refreshExpiredToken";
pub const RESET_PASSWORD: &str = "/api/user/resetPassword";
pub const FORGOT_PASSWORD: &str = "/api/user/forgetPassword";
pub const VERIFY_OTP: &str = "/api/user/verify-otp";
pub const SET_FORGOT_PASSWORD: &str = "/api/user/setForgetPassword";

// Catalog
pub const PRODUCT_PAGE: &str = "/api/limited/getLimitProduct";
pub const SINGLE_PRODUCT: &str = "/api/limited/getSingleProduct";
pub const ALL_PRODUCTS: &str = "/api/product/all";

// Wishlist and cart
pub const LIKE_LIST: &str = "/api/like/likeList";
pub const LIKE_PRODUCT: &str = "/api/like/likeProduct";
pub const DISLIKE_PRODUCT: &str = "/api/like/dislikeProduct";
pub const CART_LIST: &str = "/api/cart/cartList";
pub const CART_ADD: &str = "/api/cart/addCartProduct";
pub const CART_REMOVE: &str = "/api/cart/disCartProduct";

// Addresses
pub const ADDRESSES: &str = "/address/get-all-address";
pub const ADD_ADDRESS: &str = "/address/add-address";

// Orders
pub const PLACE_ORDER: &str = "/api/order/place-order";
pub const MY_ORDERS: &str = "/api/order/my-orders";
pub const CANCEL_ORDER: &str = "/api/order/cancel/Odder";

// Admin dashboard
pub const ADMIN_STATS: &str = "/api/dashboard/admin/stats";
pub const ADMIN_ORDERS: &str = "/api/dashboard/admin/orders";
pub const ALL_PINCODES: &str = "/api/dashboard/admin/all-pincodes";
pub const ADMIN_PRODUCTS: &str = "/api/dashboard/getAllProduct";
pub const ADD_PRODUCT: &str = "/api/dashboard/addNewProduct";
pub const UPDATE_STOCK: &str = "/api/dashboard/admin/update-stock";
pub const UPDATE_ORDER_STATUS: &str = "/api/dashboard/admin/update-order-status";
pub const ADD_PINCODE: &str = "/api/dashboard/admin/add-pincode";
pub const TOGGLE_PINCODE: &str = "/api/dashboard/admin/updateDeliveryAvlabelStatus";
pub const DELETE_PRODUCT_PREFIX: &str = "/api/dashboard/deleteProduct/";

/// Path for deleting one product.
#[must_use]
pub fn delete_product(id: &str) -> String {
    format!("{DELETE_PRODUCT_PREFIX}{id}")
}
